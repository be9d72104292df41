use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Sense, Stroke, Ui, Vec2, vec2};

use crate::config::LayoutMode;
use crate::util::short_label;

use super::super::interaction::fuzzy_label_matches;
use super::super::lod::Marker;
use super::super::render_utils::{blend_color, circle_visible, dim_color, draw_background, edge_visible};
use super::super::style::AGGREGATE_FILL;
use super::super::{SearchMatchCache, ViewModel};
use super::minimap::Minimap;

const HOVER_GROWTH: f32 = 1.15;
const MIN_SCREEN_RADIUS: f32 = 2.0;

impl ViewModel {
    fn cached_fuzzy_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.graph_revision == self.graph_revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matches = Arc::new(fuzzy_label_matches(self.session.graph(), query));
        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            graph_revision: self.graph_revision,
            matches: Arc::clone(&matches),
        });
        Some(matches)
    }

    /// Input, one session tick, then edges, markers, labels and the minimap.
    pub(in crate::app) fn draw_map(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.handle_map_input(ui, rect, &response);

        let selected_before = self.session.selected();
        let animating = self.session.tick(rect, &mut self.details);
        self.note_selection(selected_before);
        if animating || self.session.is_dragging() || self.details.is_loading() {
            ui.ctx().request_repaint();
        }

        let fuzzy_matches = self.cached_fuzzy_matches();
        let session = &self.session;
        let camera = session.camera();
        let zoom = camera.zoom();
        let nodes = session.nodes();
        let graph = session.graph();
        let lod = session.lod();
        let exploring = session.mode() == LayoutMode::ProximityExploration;

        draw_background(&painter, rect, camera.world_to_screen(rect, Vec2::ZERO), zoom);

        if graph.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No documents to show.",
                FontId::proportional(16.0),
                Color32::from_gray(200),
            );
            self.visible_marker_count = 0;
            self.visible_edge_count = 0;
            return;
        }

        let markers = lod.markers();
        let world_positions = markers
            .iter()
            .map(|marker| lod.position(marker, nodes))
            .collect::<Vec<_>>();
        let screen_positions = world_positions
            .iter()
            .map(|world| camera.world_to_screen(rect, *world))
            .collect::<Vec<_>>();
        let screen_radii = markers
            .iter()
            .map(|marker| (lod.radius(marker, nodes) * zoom).max(MIN_SCREEN_RADIUS))
            .collect::<Vec<_>>();
        let visible = (0..markers.len())
            .map(|index| circle_visible(rect, screen_positions[index], screen_radii[index] * HOVER_GROWTH))
            .collect::<Vec<_>>();

        let hovered = session.hovered_marker();
        let selected_marker = session.selected().and_then(|node| lod.marker_of(node));
        let fuzzy_active = fuzzy_matches.as_ref().is_some_and(|matches| !matches.is_empty());
        let marker_matches = |marker: &Marker| {
            fuzzy_matches.as_ref().is_some_and(|matches| match marker {
                Marker::Node(index) => matches.contains(index),
                Marker::Aggregate(aggregate) => aggregate.members.iter().any(|member| matches.contains(member)),
            })
        };

        let zoom_sqrt = zoom.sqrt();
        let mut visible_edge_count = 0usize;
        for (from, to) in lod.marker_edges(&graph.edges) {
            let start = screen_positions[from];
            let end = screen_positions[to];
            if !visible[from] && !visible[to] && !edge_visible(rect, start, end, 2.5) {
                continue;
            }
            if exploring
                && !session
                    .exploration()
                    .edge_in_range(world_positions[from], world_positions[to])
            {
                continue;
            }

            let touches_selection = selected_marker.is_some_and(|marker| marker == from || marker == to);
            let touches_hover = hovered.is_some_and(|marker| marker == from || marker == to);
            let (width, color) = if touches_selection {
                ((2.4 * zoom_sqrt).clamp(1.2, 4.4), Color32::from_rgb(245, 206, 93))
            } else if touches_hover {
                ((2.0 * zoom_sqrt).clamp(1.0, 3.6), Color32::from_rgb(241, 146, 94))
            } else {
                (
                    (1.1 * zoom_sqrt).clamp(0.6, 3.0),
                    Color32::from_rgba_unmultiplied(100, 116, 139, 170),
                )
            };
            painter.line_segment([start, end], Stroke::new(width, color));
            visible_edge_count += 1;
        }
        self.visible_edge_count = visible_edge_count;

        let show_labels = zoom >= self.config.render.label_min_zoom;
        let mut visible_marker_count = 0usize;
        for (index, marker) in markers.iter().enumerate() {
            if !visible[index] {
                continue;
            }
            visible_marker_count += 1;

            let position = screen_positions[index];
            let is_hovered = hovered == Some(index);
            let is_selected = selected_marker == Some(index);
            let is_match = marker_matches(marker);
            let is_neighbor = match marker {
                Marker::Node(node) => session
                    .selected()
                    .is_some_and(|selected| selected != *node && graph.are_connected(selected, *node)),
                Marker::Aggregate(_) => false,
            };
            let radius = if is_hovered {
                screen_radii[index] * HOVER_GROWTH
            } else {
                screen_radii[index]
            };

            let (base_fill, outline, label) = match marker {
                Marker::Node(node) => {
                    let document = &graph.nodes[*node];
                    let style = session.styles().style(&document.cluster);
                    (style.fill, style.outline, short_label(&document.label, 28))
                }
                Marker::Aggregate(aggregate) => (AGGREGATE_FILL, dim_color(AGGREGATE_FILL, 0.5), aggregate.label()),
            };

            let fill = if is_neighbor {
                blend_color(base_fill, Color32::from_rgb(245, 206, 93), 0.35)
            } else if is_match {
                blend_color(base_fill, Color32::from_rgb(103, 196, 255), 0.55)
            } else if fuzzy_active {
                dim_color(base_fill, 0.45)
            } else {
                base_fill
            };

            painter.circle_filled(position, radius, fill);
            let outline_stroke = if is_hovered {
                Stroke::new(2.2, Color32::from_gray(245))
            } else {
                Stroke::new(1.2, outline)
            };
            painter.circle_stroke(position, radius, outline_stroke);
            if is_selected {
                painter.circle_stroke(
                    position,
                    radius + 5.0,
                    Stroke::new(2.0, Color32::from_rgb(245, 206, 93)),
                );
            }

            let aggregate = matches!(marker, Marker::Aggregate(_));
            if aggregate {
                painter.text(
                    position,
                    Align2::CENTER_CENTER,
                    label,
                    FontId::proportional(12.0),
                    Color32::from_gray(20),
                );
            } else if show_labels || is_hovered || is_selected {
                painter.text(
                    position + vec2(0.0, radius + 4.0),
                    Align2::CENTER_TOP,
                    label,
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
        }
        self.visible_marker_count = visible_marker_count;

        if exploring {
            let exploration = session.exploration();
            let avatar = camera.world_to_screen(rect, exploration.avatar());
            painter.circle_stroke(
                avatar,
                exploration.radius() * zoom,
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(120, 200, 255, 120)),
            );
            painter.circle_filled(avatar, 9.0, Color32::from_rgb(56, 189, 248));
        }

        if let Some(marker) = hovered.and_then(|index| markers.get(index)) {
            let text = match marker {
                Marker::Node(node) => {
                    let document = &graph.nodes[*node];
                    format!(
                        "{}  |  {}  |  links {}",
                        document.label,
                        document.cluster,
                        graph.neighbors(*node).len()
                    )
                }
                Marker::Aggregate(aggregate) => format!("{}  |  click to zoom in", aggregate.label()),
            };
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if self.config.render.show_minimap {
            let minimap = Minimap::new(rect, self.config.render.minimap_scale);
            minimap.draw(&painter, session, rect);
        }
        self.draw_trail_overlay(&painter, rect.left_bottom());
    }

    fn draw_trail_overlay(&self, painter: &egui::Painter, corner: Pos2) {
        let trail = self.session.breadcrumb();
        if trail.is_empty() {
            return;
        }
        painter.text(
            corner + vec2(10.0, -10.0),
            Align2::LEFT_BOTTOM,
            trail.trail(4),
            FontId::proportional(12.0),
            Color32::from_gray(210),
        );
    }
}

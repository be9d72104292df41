use std::path::PathBuf;

use eframe::egui::{self, Align, Context, Layout, RichText, Ui};

use crate::atlas::{Ingestion, KnowledgeGraph};
use crate::config::{self, AtlasConfig, LayoutMode};
use crate::util::short_label;

use super::super::history::BookmarkStore;
use super::super::interaction::search_documents;
use super::super::session::{AtlasSession, DetailPanel};
use super::super::ViewModel;
use super::DetailsPane;

const SEARCH_RESULT_ROWS: usize = 40;
const TRAIL_ENTRIES: usize = 6;

/// Count line under the search box. Short queries say nothing.
fn search_feedback(results: Option<&[usize]>) -> Option<String> {
    match results? {
        [] => Some("No results found.".to_owned()),
        [_] => Some("1 document".to_owned()),
        results => Some(format!("{} documents", results.len())),
    }
}

impl ViewModel {
    pub(in crate::app) fn new(
        config: AtlasConfig,
        config_path: Option<PathBuf>,
        bookmarks: BookmarkStore,
    ) -> Self {
        let mut session = AtlasSession::new(KnowledgeGraph::default(), &config);
        if let Some(snapshot) = bookmarks.camera() {
            if session.restore_camera(snapshot) {
                tracing::info!(x = snapshot.x, y = snapshot.y, zoom = snapshot.zoom, "restored camera bookmark");
            } else {
                tracing::warn!("ignoring malformed camera bookmark");
            }
        }

        Self {
            session,
            config,
            config_path,
            details: DetailsPane::default(),
            bookmarks,
            search: String::new(),
            search_match_cache: None,
            graph_revision: 0,
            bookmark_on_select: false,
            loaded: false,
            ingest_warning: None,
            status_message: None,
            visible_marker_count: 0,
            visible_edge_count: 0,
        }
    }

    pub(in crate::app) fn apply_ingestion(&mut self, ingestion: Ingestion) {
        self.session.replace_graph(ingestion.graph);
        self.graph_revision += 1;
        self.search_match_cache = None;
        self.details.close();
        self.ingest_warning = ingestion.warning;
        self.loaded = true;
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context, reload_requested: &mut bool, is_loading: bool) {
        if self.details.poll() {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Cognitive Atlas");
                    ui.separator();
                    let reload_button = ui.add_enabled(!is_loading, egui::Button::new("Reload"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if is_loading {
                        ui.spinner();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.status_text());
                    });
                });
                if let Some(warning) = &self.ingest_warning {
                    ui.colored_label(egui::Color32::from_rgb(240, 180, 90), warning.as_str());
                }
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("controls_scroll")
                    .show(ui, |ui| self.draw_controls(ui));
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.loaded && is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Loading knowledge map...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_map(ui);
            }
        });
    }

    fn status_text(&self) -> String {
        let stats = self.session.stats();
        let mut text = format!(
            "nodes: {}  edges: {}  markers: {}/{}  zoom: {:.2}",
            stats.nodes,
            stats.edges,
            self.visible_marker_count,
            stats.markers,
            self.session.camera().zoom(),
        );
        if self.session.lod().is_aggregated() {
            text.push_str(" (aggregated)");
        }
        let center = -self.session.camera().current().pan;
        text.push_str(&format!("  center: ({:.0}, {:.0})", center.x, center.y));
        if stats.resting {
            text.push_str("  layout: resting");
        } else {
            text.push_str(&format!("  energy: {:.3}", stats.energy));
        }
        if let Some(message) = &self.status_message {
            text.push_str("  |  ");
            text.push_str(message);
        }
        text
    }

    /// Selects a node and moves the camera onto it.
    pub(in crate::app) fn focus_node(&mut self, index: usize) {
        let before = self.session.selected();
        self.session.focus_node(index, &mut self.details);
        self.note_selection(before);
    }

    /// Records newly selected labels as bookmarks when the toggle is on.
    pub(in crate::app) fn note_selection(&mut self, before: Option<usize>) {
        if !self.bookmark_on_select {
            return;
        }
        let Some(index) = self.session.selected() else {
            return;
        };
        if before == Some(index) {
            return;
        }
        let Some(label) = self.session.graph().nodes.get(index).map(|node| node.label.clone()) else {
            return;
        };
        match self.bookmarks.add_label(&label) {
            Ok(true) => self.status_message = Some(format!("bookmarked {label}")),
            Ok(false) => {}
            Err(error) => {
                tracing::warn!(%error, "failed to store node bookmark");
                self.status_message = Some(format!("{error:#}"));
            }
        }
    }

    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Navigate");
        ui.add_space(4.0);

        ui.label("Search");
        let search_response = ui.text_edit_singleline(&mut self.search);
        if search_response.changed() {
            self.session.search_focus(&self.search);
        }

        let results = search_documents(self.session.graph(), &self.search, self.details.fragments());
        if let Some(feedback) = search_feedback(results.as_deref()) {
            ui.small(feedback);
        }
        if let Some(results) = results.filter(|results| !results.is_empty()) {
            let mut clicked = None;
            egui::ScrollArea::vertical()
                .id_salt("search_results_scroll")
                .max_height(180.0)
                .show(ui, |ui| {
                    for &index in results.iter().take(SEARCH_RESULT_ROWS) {
                        let Some(document) = self.session.graph().nodes.get(index) else {
                            continue;
                        };
                        let label = format!("{}  [{}]", short_label(&document.label, 36), document.cluster);
                        if ui.link(label).clicked() {
                            clicked = Some(index);
                        }
                    }
                });
            if let Some(index) = clicked {
                self.focus_node(index);
            }
        }

        ui.separator();
        ui.label(RichText::new("Mode").strong());
        let mut mode = self.session.mode();
        egui::ComboBox::from_id_salt("layout_mode")
            .selected_text(mode.label())
            .show_ui(ui, |ui| {
                for candidate in LayoutMode::ALL {
                    ui.selectable_value(&mut mode, candidate, candidate.label());
                }
            });
        if mode != self.session.mode() {
            if self.session.mode() == LayoutMode::ProximityExploration {
                self.details.close();
            }
            self.session.set_mode(mode);
            self.config.mode = mode;
        }
        if mode == LayoutMode::ProximityExploration {
            ui.small("Arrow keys move the avatar.");
        }

        ui.separator();
        self.draw_history(ui);

        ui.separator();
        self.draw_settings(ui);
    }

    fn draw_history(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Trail").strong());
        let trail = self.session.breadcrumb();
        if trail.is_empty() {
            ui.small("Nothing visited yet.");
        } else {
            ui.small(format!("{} visited", trail.len()));
            ui.label(trail.trail(TRAIL_ENTRIES));
            let mut clicked = None;
            ui.horizontal_wrapped(|ui| {
                for entry in trail.recent(TRAIL_ENTRIES) {
                    if ui.small_button(short_label(&entry.label, 18)).clicked() {
                        clicked = self.session.graph().index_of(&entry.node_id);
                    }
                }
            });
            if let Some(index) = clicked {
                self.focus_node(index);
            }
        }

        ui.add_space(6.0);
        ui.label(RichText::new("Bookmarks").strong());
        ui.horizontal(|ui| {
            if ui.button("Bookmark view").clicked() {
                let snapshot = self.session.camera_snapshot();
                self.status_message = Some(match self.bookmarks.save_camera(snapshot) {
                    Ok(()) => match self.bookmarks.path() {
                        Some(path) => format!("view bookmarked in {}", path.display()),
                        None => "view bookmarked".to_owned(),
                    },
                    Err(error) => {
                        tracing::warn!(%error, "failed to store camera bookmark");
                        format!("{error:#}")
                    }
                });
            }
            let stored = self.bookmarks.camera();
            if ui
                .add_enabled(stored.is_some(), egui::Button::new("Restore view"))
                .clicked()
                && let Some(snapshot) = stored
            {
                self.session.restore_camera(snapshot);
            }
        });
        ui.checkbox(&mut self.bookmark_on_select, "Bookmark selected nodes");

        let mut focus_label = None;
        let mut remove_label = None;
        for label in self.bookmarks.labels() {
            ui.horizontal(|ui| {
                if ui.link(short_label(label, 30)).clicked() {
                    focus_label = Some(label.clone());
                }
                if ui.small_button("x").clicked() {
                    remove_label = Some(label.clone());
                }
            });
        }
        if let Some(label) = focus_label
            && let Some(index) = self
                .session
                .graph()
                .nodes
                .iter()
                .position(|node| node.label == label)
        {
            self.focus_node(index);
        }
        if let Some(label) = remove_label
            && let Err(error) = self.bookmarks.remove_label(&label)
        {
            tracing::warn!(%error, "failed to remove node bookmark");
        }
    }

    fn draw_settings(&mut self, ui: &mut Ui) {
        egui::CollapsingHeader::new("Layout")
            .default_open(false)
            .show(ui, |ui| {
                let layout = &mut self.config.layout;
                let mut changed = false;
                changed |= ui
                    .add(egui::Slider::new(&mut layout.repulsion, 200.0..=6000.0).text("repulsion"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut layout.spring, 0.001..=0.1).text("spring"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut layout.rest_length, 40.0..=400.0).text("rest length"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut layout.cluster_pull, 0.0..=0.05).text("cluster pull"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut layout.damping, 0.5..=0.98).text("damping"))
                    .changed();
                if changed {
                    self.session.apply_layout_config(self.config.layout.clone());
                }
            });

        egui::CollapsingHeader::new("Detail levels")
            .default_open(false)
            .show(ui, |ui| {
                let lod = &mut self.config.lod;
                let mut changed = ui.checkbox(&mut lod.enabled, "aggregate at low zoom").changed();
                changed |= ui
                    .add(egui::Slider::new(&mut lod.zoom_threshold, 0.1..=1.5).text("below zoom"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut lod.cell_size, 100.0..=1200.0).text("cell size"))
                    .changed();
                if changed {
                    self.session.apply_lod_config(self.config.lod.clone());
                }

                let render = &mut self.config.render;
                ui.checkbox(&mut render.show_minimap, "minimap");
                ui.add(egui::Slider::new(&mut render.label_min_zoom, 0.1..=2.0).text("labels above zoom"));
            });

        if ui.button("Save settings").clicked() {
            self.status_message = Some(match config::save(&self.config, self.config_path.as_deref()) {
                Ok(path) => {
                    tracing::info!(path = %path.display(), "saved settings");
                    format!("saved {}", path.display())
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to save settings");
                    format!("{error:#}")
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::DocumentNode;

    fn model() -> ViewModel {
        ViewModel::new(AtlasConfig::default(), None, BookmarkStore::in_memory())
    }

    fn ingestion() -> Ingestion {
        Ingestion {
            graph: KnowledgeGraph::build(
                vec![
                    DocumentNode::new("1", "Hub", Some("core".to_owned())),
                    DocumentNode::new("2", "Research", Some("knowledge".to_owned())),
                ],
                None,
            ),
            warning: None,
        }
    }

    #[test]
    fn ingestion_swaps_graph_and_bumps_revision() {
        let mut model = model();
        assert!(!model.loaded);
        model.apply_ingestion(ingestion());
        assert!(model.loaded);
        assert_eq!(model.graph_revision, 1);
        assert_eq!(model.session.graph().node_count(), 2);
        assert!(model.status_text().contains("nodes: 2"));
    }

    #[test]
    fn search_feedback_reports_empty_results() {
        let mut model = model();
        model.apply_ingestion(ingestion());
        let fragments = model.details.fragments();

        let missing = search_documents(model.session.graph(), "oficina", fragments);
        assert_eq!(search_feedback(missing.as_deref()).as_deref(), Some("No results found."));

        let found = search_documents(model.session.graph(), "research", fragments);
        assert_eq!(search_feedback(found.as_deref()).as_deref(), Some("1 document"));

        let short = search_documents(model.session.graph(), "r", fragments);
        assert_eq!(search_feedback(short.as_deref()), None);
    }

    #[test]
    fn failed_ingestion_surfaces_warning_on_empty_map() {
        let mut model = model();
        model.apply_ingestion(Ingestion {
            graph: KnowledgeGraph::default(),
            warning: Some("failed to read manifest".to_owned()),
        });
        assert!(model.session.graph().is_empty());
        assert_eq!(model.ingest_warning.as_deref(), Some("failed to read manifest"));
    }

    #[test]
    fn focusing_with_bookmark_toggle_records_label() {
        let mut model = model();
        model.apply_ingestion(ingestion());
        model.bookmark_on_select = true;
        model.focus_node(1);
        model.focus_node(1);
        assert_eq!(model.bookmarks.labels(), ["Research".to_owned()]);
        assert_eq!(model.details.current().map(|request| request.title.as_str()), Some("Research"));
        assert_eq!(model.session.breadcrumb().len(), 2);
    }

    #[test]
    fn camera_bookmark_is_restored_before_first_frame() {
        let mut bookmarks = BookmarkStore::in_memory();
        let snapshot = crate::app::camera::CameraSnapshot {
            x: 120.0,
            y: -80.0,
            zoom: 2.0,
        };
        bookmarks.save_camera(snapshot).expect("save in memory");

        let model = ViewModel::new(AtlasConfig::default(), None, bookmarks);
        assert_eq!(model.session.camera_snapshot(), snapshot);
        assert_eq!(model.session.camera().current().zoom, 2.0);
    }
}

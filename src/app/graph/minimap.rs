use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, StrokeKind, Vec2, vec2};

use super::super::session::AtlasSession;

const MINIMAP_SIZE: Vec2 = vec2(180.0, 120.0);
const MINIMAP_MARGIN: f32 = 10.0;

/// Fixed-scale overview anchored to the bottom-right corner of the map.
pub(super) struct Minimap {
    rect: Rect,
    scale: f32,
}

impl Minimap {
    pub(super) fn new(map_rect: Rect, scale: f32) -> Self {
        let rect = Rect::from_min_size(
            map_rect.right_bottom() - MINIMAP_SIZE - vec2(MINIMAP_MARGIN, MINIMAP_MARGIN),
            MINIMAP_SIZE,
        );
        Self { rect, scale }
    }

    /// World origin sits at the minimap center.
    pub(super) fn project(&self, world: Vec2) -> Pos2 {
        self.rect.center() + world * self.scale
    }

    pub(super) fn draw(&self, painter: &Painter, session: &AtlasSession, map_rect: Rect) {
        let painter = painter.with_clip_rect(self.rect);
        painter.rect_filled(self.rect, 5.0, Color32::from_rgba_unmultiplied(12, 15, 20, 220));
        painter.rect_stroke(
            self.rect,
            5.0,
            Stroke::new(1.0, Color32::from_gray(70)),
            StrokeKind::Middle,
        );

        let styles = session.styles();
        for (node, document) in session.nodes().iter().zip(&session.graph().nodes) {
            let position = self.project(node.world_pos);
            if !self.rect.contains(position) {
                continue;
            }
            painter.circle_filled(position, 2.0, styles.style(&document.cluster).fill);
        }

        let visible = session.camera().visible_world_rect(map_rect);
        let frame = Rect::from_two_pos(
            self.project(visible.min.to_vec2()),
            self.project(visible.max.to_vec2()),
        );
        painter.rect_stroke(
            frame,
            0.0,
            Stroke::new(1.0, Color32::from_rgb(245, 206, 93)),
            StrokeKind::Middle,
        );
    }
}

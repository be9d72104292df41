use eframe::egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::CameraConfig;

const PAN_SETTLE_EPSILON: f32 = 0.01;
const ZOOM_SETTLE_EPSILON: f32 = 1e-4;
const MIN_PINCH_DISTANCE: f32 = 1.0;

/// Pan is a world-space offset: `screen = center + (world + pan) * zoom`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct CameraState {
    pub pan: Vec2,
    pub zoom: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

/// Persisted `{x, y, zoom}` form of a camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(in crate::app) struct CameraSnapshot {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

#[derive(Clone, Copy, Debug)]
struct PinchGesture {
    start_distance: f32,
    start_zoom: f32,
}

pub(in crate::app) struct Camera {
    current: CameraState,
    target: CameraState,
    zoom_min: f32,
    zoom_max: f32,
    smoothing: f32,
    focus_zoom: f32,
    wheel_step: f32,
    pinch: Option<PinchGesture>,
}

impl Camera {
    pub(in crate::app) fn new(config: &CameraConfig) -> Self {
        let zoom_min = config.zoom_min.min(config.zoom_max);
        let zoom_max = config.zoom_max.max(config.zoom_min);
        let start = CameraState {
            pan: Vec2::ZERO,
            zoom: 1.0_f32.clamp(zoom_min, zoom_max),
        };

        Self {
            current: start,
            target: start,
            zoom_min,
            zoom_max,
            smoothing: config.smoothing.clamp(0.0, 1.0),
            focus_zoom: config.focus_zoom.clamp(zoom_min, zoom_max),
            wheel_step: config.wheel_step.max(1.0),
            pinch: None,
        }
    }

    pub(in crate::app) fn current(&self) -> CameraState {
        self.current
    }

    pub(in crate::app) fn target(&self) -> CameraState {
        self.target
    }

    pub(in crate::app) fn zoom(&self) -> f32 {
        self.current.zoom
    }

    fn clamp_zoom(&self, zoom: f32) -> f32 {
        if zoom.is_finite() {
            zoom.clamp(self.zoom_min, self.zoom_max)
        } else {
            self.target.zoom
        }
    }

    /// Eases `current` toward `target` by the smoothing factor. Returns `true`
    /// while any component is still moving; snaps once the remaining distance
    /// is negligible or too small to represent.
    pub(in crate::app) fn advance(&mut self) -> bool {
        let pan_delta = self.target.pan - self.current.pan;
        let zoom_delta = self.target.zoom - self.current.zoom;
        let next_pan = self.current.pan + pan_delta * self.smoothing;
        let next_zoom = self.current.zoom + zoom_delta * self.smoothing;

        let pan_done = pan_delta.length() <= PAN_SETTLE_EPSILON || next_pan == self.current.pan;
        let zoom_done = zoom_delta.abs() <= ZOOM_SETTLE_EPSILON || next_zoom == self.current.zoom;
        if pan_done && zoom_done {
            self.current = self.target;
            return false;
        }

        self.current.pan = next_pan;
        self.current.zoom = next_zoom;
        true
    }

    pub(in crate::app) fn world_to_screen(&self, viewport: Rect, world: Vec2) -> Pos2 {
        viewport.center() + (world + self.current.pan) * self.current.zoom
    }

    pub(in crate::app) fn screen_to_world(&self, viewport: Rect, screen: Pos2) -> Vec2 {
        (screen - viewport.center()) / self.current.zoom - self.current.pan
    }

    /// World-space rectangle currently covered by `viewport`.
    pub(in crate::app) fn visible_world_rect(&self, viewport: Rect) -> Rect {
        let min = self.screen_to_world(viewport, viewport.min);
        let max = self.screen_to_world(viewport, viewport.max);
        Rect::from_two_pos(min.to_pos2(), max.to_pos2())
    }

    /// One wheel notch: positive `scroll` zooms in by the configured step.
    pub(in crate::app) fn zoom_by_wheel(&mut self, scroll: f32, anchor: Option<(Rect, Pos2)>) {
        if scroll.abs() <= f32::EPSILON || !scroll.is_finite() {
            return;
        }
        let factor = if scroll > 0.0 {
            self.wheel_step
        } else {
            1.0 / self.wheel_step
        };
        self.zoom_by_factor(factor, anchor);
    }

    /// Multiplies the target zoom. With an anchor, the pan target is moved so
    /// the world point under the cursor stays under it once the camera settles.
    fn zoom_by_factor(&mut self, factor: f32, anchor: Option<(Rect, Pos2)>) {
        let zoom = self.clamp_zoom(self.target.zoom * factor);
        if let Some((viewport, cursor)) = anchor {
            let world = self.screen_to_world(viewport, cursor);
            self.target.pan = (cursor - viewport.center()) / zoom - world;
        }
        self.target.zoom = zoom;
    }

    /// Drag pan: the screen delta is divided by the current zoom so content
    /// follows the pointer 1:1. Both states shift so easing is unaffected.
    pub(in crate::app) fn pan_by_screen_delta(&mut self, delta: Vec2) {
        if !delta.x.is_finite() || !delta.y.is_finite() {
            return;
        }
        let world_delta = delta / self.current.zoom;
        self.current.pan += world_delta;
        self.target.pan += world_delta;
    }

    pub(in crate::app) fn begin_pinch(&mut self, distance: f32) {
        if distance < MIN_PINCH_DISTANCE || !distance.is_finite() {
            return;
        }
        self.pinch = Some(PinchGesture {
            start_distance: distance,
            start_zoom: self.target.zoom,
        });
    }

    /// Zoom follows `distance / start_distance` times the zoom captured when
    /// the gesture began, so repeated updates never accumulate drift.
    pub(in crate::app) fn update_pinch(&mut self, distance: f32) {
        let Some(gesture) = self.pinch else {
            return;
        };
        if !distance.is_finite() {
            return;
        }
        self.target.zoom =
            self.clamp_zoom(gesture.start_zoom * (distance / gesture.start_distance));
    }

    pub(in crate::app) fn end_pinch(&mut self) {
        self.pinch = None;
    }

    /// Centers `world` and zooms to the focus level.
    pub(in crate::app) fn focus_on(&mut self, world: Vec2) {
        self.target.pan = -world;
        self.target.zoom = self.focus_zoom;
    }

    pub(in crate::app) fn center_on(&mut self, world: Vec2) {
        self.target.pan = -world;
    }

    pub(in crate::app) fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            x: self.target.pan.x,
            y: self.target.pan.y,
            zoom: self.target.zoom,
        }
    }

    /// Jumps to a stored snapshot. Non-finite or non-positive data is
    /// rejected and leaves the camera untouched.
    pub(in crate::app) fn restore(&mut self, snapshot: CameraSnapshot) -> bool {
        let valid = snapshot.x.is_finite()
            && snapshot.y.is_finite()
            && snapshot.zoom.is_finite()
            && snapshot.zoom > 0.0;
        if !valid {
            return false;
        }

        let state = CameraState {
            pan: Vec2::new(snapshot.x, snapshot.y),
            zoom: snapshot.zoom.clamp(self.zoom_min, self.zoom_max),
        };
        self.current = state;
        self.target = state;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{pos2, vec2};

    fn viewport() -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(1200.0, 800.0))
    }

    fn settle(camera: &mut Camera) {
        for _ in 0..2_000 {
            if !camera.advance() {
                break;
            }
        }
    }

    fn assert_close(a: Vec2, b: Vec2) {
        assert!((a - b).length() < 1e-2, "{a:?} != {b:?}");
    }

    #[test]
    fn screen_and_world_mappings_are_inverse() {
        let points = [vec2(0.0, 0.0), vec2(-240.0, 120.0), vec2(913.5, -77.25)];
        let states = [
            (vec2(0.0, 0.0), 1.0),
            (vec2(200.0, -140.0), 0.3),
            (vec2(-1300.0, 55.5), 2.5),
        ];

        for (pan, zoom) in states {
            let mut camera = Camera::new(&CameraConfig::default());
            assert!(camera.restore(CameraSnapshot {
                x: pan.x,
                y: pan.y,
                zoom,
            }));
            for point in points {
                let screen = camera.world_to_screen(viewport(), point);
                assert_close(camera.screen_to_world(viewport(), screen), point);
            }
        }
    }

    #[test]
    fn advance_converges_without_overshoot() {
        let mut camera = Camera::new(&CameraConfig::default());
        camera.focus_on(vec2(300.0, -200.0));

        let mut remaining = (camera.target().pan - camera.current().pan).length();
        for _ in 0..50 {
            camera.advance();
            let next = (camera.target().pan - camera.current().pan).length();
            assert!(next <= remaining);
            assert!(camera.current().pan.x >= -300.0 - 1e-3);
            remaining = next;
        }

        settle(&mut camera);
        assert_eq!(camera.current(), camera.target());
        assert!(!camera.advance());
    }

    #[test]
    fn zoom_stays_within_bounds_for_any_input_sequence() {
        let config = CameraConfig::default();
        let mut camera = Camera::new(&config);

        for step in 0..200 {
            let scroll = if step % 7 < 5 { 1.0 } else { -1.0 };
            camera.zoom_by_wheel(scroll * 3.0, Some((viewport(), pos2(100.0, 700.0))));
            assert!(camera.target().zoom <= config.zoom_max);
            assert!(camera.target().zoom >= config.zoom_min);
        }

        camera.begin_pinch(100.0);
        for distance in [1.0, 5_000.0, 0.0, 40.0, f32::INFINITY] {
            camera.update_pinch(distance);
            let zoom = camera.target().zoom;
            assert!((config.zoom_min..=config.zoom_max).contains(&zoom));
        }
        camera.end_pinch();

        for step in 0..200 {
            let scroll = if step % 3 == 0 { 1.0 } else { -1.0 };
            camera.zoom_by_wheel(scroll, None);
            assert!(camera.target().zoom >= config.zoom_min);
        }
    }

    #[test]
    fn anchored_zoom_keeps_cursor_point_fixed() {
        let mut camera = Camera::new(&CameraConfig::default());
        let cursor = pos2(900.0, 150.0);
        let world_before = camera.screen_to_world(viewport(), cursor);

        camera.zoom_by_wheel(1.0, Some((viewport(), cursor)));
        camera.zoom_by_wheel(1.0, Some((viewport(), cursor)));
        settle(&mut camera);

        assert!((camera.zoom() - 1.21).abs() < 1e-3);
        assert_close(camera.screen_to_world(viewport(), cursor), world_before);
    }

    #[test]
    fn drag_follows_pointer_under_current_zoom() {
        let mut camera = Camera::new(&CameraConfig::default());
        assert!(camera.restore(CameraSnapshot {
            x: 0.0,
            y: 0.0,
            zoom: 2.0,
        }));
        let grabbed = pos2(700.0, 500.0);
        let world = camera.screen_to_world(viewport(), grabbed);

        camera.pan_by_screen_delta(vec2(40.0, -10.0));

        assert_close(camera.target().pan, vec2(20.0, -5.0));
        assert_close(
            camera.screen_to_world(viewport(), grabbed + vec2(40.0, -10.0)),
            world,
        );
    }

    #[test]
    fn pinch_uses_ratio_from_gesture_start() {
        let mut camera = Camera::new(&CameraConfig::default());
        camera.begin_pinch(100.0);
        camera.update_pinch(150.0);
        camera.update_pinch(150.0);
        camera.update_pinch(150.0);
        assert!((camera.target().zoom - 1.5).abs() < 1e-5);

        camera.update_pinch(50.0);
        assert!((camera.target().zoom - 0.5).abs() < 1e-5);
        camera.end_pinch();
        assert!(camera.pinch.is_none());

        camera.update_pinch(400.0);
        assert!((camera.target().zoom - 0.5).abs() < 1e-5);
    }

    #[test]
    fn restore_rejects_malformed_snapshots() {
        let mut camera = Camera::new(&CameraConfig::default());
        let before = camera.target();
        assert!(!camera.restore(CameraSnapshot {
            x: f32::NAN,
            y: 0.0,
            zoom: 1.0,
        }));
        assert!(!camera.restore(CameraSnapshot {
            x: 0.0,
            y: 0.0,
            zoom: -1.0,
        }));
        assert_eq!(camera.target(), before);

        assert!(camera.restore(CameraSnapshot {
            x: 10.0,
            y: 20.0,
            zoom: 99.0,
        }));
        assert_eq!(camera.current().zoom, CameraConfig::default().zoom_max);
        assert_eq!(camera.snapshot().x, 10.0);
    }

    #[test]
    fn visible_world_rect_matches_viewport_extent() {
        let mut camera = Camera::new(&CameraConfig::default());
        assert!(camera.restore(CameraSnapshot {
            x: -100.0,
            y: 50.0,
            zoom: 2.0,
        }));
        let rect = camera.visible_world_rect(viewport());
        assert!((rect.width() - 600.0).abs() < 1e-3);
        assert!((rect.height() - 400.0).abs() < 1e-3);
        assert_close(rect.center().to_vec2(), vec2(100.0, -50.0));
    }
}

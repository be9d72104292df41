use eframe::egui::{self, Event, Key, Rect, Response, Ui, Vec2, vec2};

use super::super::ViewModel;
use super::super::interaction::TouchPhase;

fn touch_phase(phase: egui::TouchPhase) -> TouchPhase {
    match phase {
        egui::TouchPhase::Start => TouchPhase::Start,
        egui::TouchPhase::Move => TouchPhase::Move,
        egui::TouchPhase::End | egui::TouchPhase::Cancel => TouchPhase::End,
    }
}

impl ViewModel {
    /// Feeds this frame's pointer, wheel, touch and arrow-key input into the
    /// session. Runs before the session ticks.
    pub(in crate::app) fn handle_map_input(&mut self, ui: &Ui, rect: Rect, response: &Response) {
        let selected_before = self.session.selected();

        let touches = ui.input(|input| {
            input
                .events
                .iter()
                .filter_map(|event| match event {
                    Event::Touch { id, phase, pos, .. } => Some((id.0, touch_phase(*phase), *pos)),
                    _ => None,
                })
                .collect::<Vec<_>>()
        });
        for (id, phase, position) in touches {
            if phase == TouchPhase::Start && !rect.contains(position) {
                continue;
            }
            self.session.touch(id, phase, position);
        }

        if response.hovered() {
            let (scroll, hover) = ui.input(|input| (input.raw_scroll_delta.y, input.pointer.hover_pos()));
            if scroll.abs() > f32::EPSILON {
                self.session.scroll(rect, hover, scroll);
            }
        }

        let (pressed, released, position) = ui.input(|input| {
            (
                input.pointer.primary_pressed(),
                input.pointer.primary_released(),
                input.pointer.interact_pos(),
            )
        });

        match position {
            Some(position) if rect.contains(position) || self.session.is_dragging() => {
                if pressed && rect.contains(position) {
                    self.session.pointer_pressed(position);
                }
                self.session.pointer_moved(rect, position);
                if released {
                    self.session.pointer_released(rect, position, &mut self.details);
                }
            }
            _ => self.session.pointer_left(),
        }

        if self.session.is_dragging() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if self.session.hovered_marker().is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
        }

        let typing = ui.ctx().memory(|memory| memory.focused().is_some());
        if !typing {
            let direction = ui.input(|input| {
                let mut direction = Vec2::ZERO;
                if input.key_pressed(Key::ArrowLeft) {
                    direction += vec2(-1.0, 0.0);
                }
                if input.key_pressed(Key::ArrowRight) {
                    direction += vec2(1.0, 0.0);
                }
                if input.key_pressed(Key::ArrowUp) {
                    direction += vec2(0.0, -1.0);
                }
                if input.key_pressed(Key::ArrowDown) {
                    direction += vec2(0.0, 1.0);
                }
                direction
            });
            if direction != Vec2::ZERO {
                self.session.move_avatar(direction, &mut self.details);
            }
        }

        self.note_selection(selected_before);
    }
}

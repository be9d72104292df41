use eframe::egui::Vec2;

use super::MapNode;
use crate::config::ExplorationConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum ProximityChange {
    Unchanged,
    Entered(usize),
    Left,
}

/// Avatar state for proximity exploration.
pub(in crate::app) struct Exploration {
    avatar: Vec2,
    active: Option<usize>,
    follow: bool,
    speed: f32,
    radius: f32,
}

impl Exploration {
    pub(in crate::app) fn new(config: &ExplorationConfig) -> Self {
        Self {
            avatar: Vec2::ZERO,
            active: None,
            follow: true,
            speed: config.avatar_speed.max(0.0),
            radius: config.proximity_radius.max(0.0),
        }
    }

    pub(in crate::app) fn reset(&mut self, avatar: Vec2) {
        self.avatar = avatar;
        self.active = None;
        self.follow = true;
    }

    pub(in crate::app) fn avatar(&self) -> Vec2 {
        self.avatar
    }

    pub(in crate::app) fn radius(&self) -> f32 {
        self.radius
    }

    pub(in crate::app) fn is_following(&self) -> bool {
        self.follow
    }

    pub(in crate::app) fn stop_following(&mut self) {
        self.follow = false;
    }

    /// Moves one fixed step along `direction` and resumes camera follow.
    pub(in crate::app) fn step(&mut self, direction: Vec2) {
        if direction.length_sq() <= f32::EPSILON || !direction.x.is_finite() || !direction.y.is_finite() {
            return;
        }
        self.avatar += direction.normalized() * self.speed;
        self.follow = true;
    }

    /// Re-evaluates which node is closest within the radius.
    pub(in crate::app) fn update_proximity(&mut self, nodes: &[MapNode]) -> ProximityChange {
        let nearest = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (index, (node.world_pos - self.avatar).length()))
            .filter(|(_, distance)| *distance < self.radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index);

        if nearest == self.active {
            return ProximityChange::Unchanged;
        }
        self.active = nearest;
        match nearest {
            Some(index) => ProximityChange::Entered(index),
            None => ProximityChange::Left,
        }
    }

    /// Edges are only drawn near the avatar.
    pub(in crate::app) fn edge_in_range(&self, from: Vec2, to: Vec2) -> bool {
        let reach = self.radius * 2.0;
        (from - self.avatar).length() < reach || (to - self.avatar).length() < reach
    }
}

mod forces;
mod quadtree;

use eframe::egui::Vec2;

use super::MapNode;
use crate::config::LayoutConfig;
use forces::{
    RepulsionParams, SpringParams, accumulate_anchor_pull, accumulate_repulsion_exact,
    accumulate_repulsion_for_node, accumulate_springs,
};
use quadtree::CellNode;

const BARNES_HUT_THETA: f32 = 0.72;
const EXACT_REPULSION_LIMIT: usize = 256;
const REPULSION_EPSILON: f32 = 0.1;

#[derive(Default)]
struct PhysicsScratch {
    forces: Vec<Vec2>,
    positions: Vec<Vec2>,
    anchors: Vec<Vec2>,
}

/// Force-directed placement. Runs while the map has residual motion and
/// sleeps once total speed falls under `rest_energy`.
pub(in crate::app) struct LayoutEngine {
    params: LayoutConfig,
    energy: f32,
    resting: bool,
    scratch: PhysicsScratch,
}

impl LayoutEngine {
    pub(in crate::app) fn new(params: LayoutConfig) -> Self {
        Self {
            params,
            energy: 0.0,
            resting: false,
            scratch: PhysicsScratch::default(),
        }
    }

    pub(in crate::app) fn set_params(&mut self, params: LayoutConfig) {
        self.params = params;
        self.wake();
    }

    pub(in crate::app) fn energy(&self) -> f32 {
        self.energy
    }

    pub(in crate::app) fn is_resting(&self) -> bool {
        self.resting
    }

    pub(in crate::app) fn wake(&mut self) {
        self.resting = false;
    }

    /// Advances one tick. Returns whether any node moved.
    pub(in crate::app) fn step(&mut self, nodes: &mut [MapNode], edges: &[(usize, usize)]) -> bool {
        if self.resting {
            return false;
        }

        let node_count = nodes.len();
        if node_count == 0 {
            self.energy = 0.0;
            self.resting = true;
            return false;
        }

        let params = &self.params;
        let scratch = &mut self.scratch;
        scratch.forces.clear();
        scratch.forces.resize(node_count, Vec2::ZERO);
        scratch.positions.clear();
        scratch.anchors.clear();
        for node in nodes.iter() {
            scratch.positions.push(node.world_pos);
            scratch.anchors.push(node.anchor);
        }

        let repulsion = RepulsionParams {
            strength: params.repulsion,
            epsilon: REPULSION_EPSILON,
            cutoff: if params.repulsion_cutoff > 0.0 {
                params.repulsion_cutoff
            } else {
                f32::INFINITY
            },
        };

        if node_count <= EXACT_REPULSION_LIMIT {
            accumulate_repulsion_exact(&scratch.positions, repulsion, &mut scratch.forces);
        } else if let Some(quadtree) = CellNode::build(&scratch.positions) {
            for (index, force) in scratch.forces.iter_mut().enumerate() {
                accumulate_repulsion_for_node(
                    &quadtree,
                    index,
                    &scratch.positions,
                    repulsion,
                    BARNES_HUT_THETA,
                    force,
                );
            }
        }

        accumulate_springs(
            &scratch.positions,
            edges,
            SpringParams {
                stiffness: params.spring,
                rest_length: params.rest_length,
            },
            &mut scratch.forces,
        );
        accumulate_anchor_pull(
            &scratch.positions,
            &scratch.anchors,
            params.cluster_pull,
            &mut scratch.forces,
        );

        let max_force = params.max_force;
        let max_speed = params.max_speed;
        let mut energy = 0.0_f32;
        for (node, force_value) in nodes.iter_mut().zip(&scratch.forces) {
            let mut force = *force_value;
            let force_len = force.length();
            if force_len > max_force {
                force *= max_force / force_len;
            }

            let mut velocity = (node.velocity + force) * params.damping;
            let mut speed = velocity.length();
            if speed > max_speed {
                velocity *= max_speed / speed;
                speed = max_speed;
            }
            if speed < params.sleep_speed || !speed.is_finite() {
                velocity = Vec2::ZERO;
                speed = 0.0;
            }

            node.velocity = velocity;
            node.world_pos += velocity;
            energy += speed;
        }

        self.energy = energy;
        if energy < params.rest_energy {
            self.resting = true;
            tracing::debug!(nodes = node_count, "layout came to rest");
        }
        energy > 0.0
    }
}

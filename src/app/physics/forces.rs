use eframe::egui::{Vec2, vec2};

use super::quadtree::CellNode;

const COINCIDENT_DISTANCE: f32 = 0.0001;

#[derive(Clone, Copy)]
pub(super) struct RepulsionParams {
    pub(super) strength: f32,
    pub(super) epsilon: f32,
    pub(super) cutoff: f32,
}

/// Unit vector pushing `index` away from `other` when the two share a
/// position. Opposite for the two members of a pair.
fn coincident_direction(index: usize, other: usize) -> Vec2 {
    let (low, high) = if index < other {
        (index, other)
    } else {
        (other, index)
    };
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214 + 0.37)
        * std::f32::consts::TAU;
    let direction = vec2(angle.cos(), angle.sin());
    if index == low { direction } else { -direction }
}

fn repulsion_between(
    index: usize,
    other: usize,
    point: Vec2,
    other_point: Vec2,
    params: RepulsionParams,
) -> Vec2 {
    let delta = point - other_point;
    let distance = delta.length();
    if distance > params.cutoff {
        return Vec2::ZERO;
    }

    let direction = if distance > COINCIDENT_DISTANCE {
        delta / distance
    } else {
        coincident_direction(index, other)
    };
    let shifted = distance + params.epsilon;
    direction * (params.strength / (shifted * shifted))
}

pub(super) fn accumulate_repulsion_exact(
    positions: &[Vec2],
    params: RepulsionParams,
    forces: &mut [Vec2],
) {
    for from in 0..positions.len() {
        for to in (from + 1)..positions.len() {
            let push = repulsion_between(from, to, positions[from], positions[to], params);
            forces[from] += push;
            forces[to] -= push;
        }
    }
}

/// Repulsion on `index` from every node in `cell`, summarising distant cells
/// by their centroid.
pub(super) fn accumulate_repulsion_for_node(
    cell: &CellNode,
    index: usize,
    positions: &[Vec2],
    params: RepulsionParams,
    theta: f32,
    force: &mut Vec2,
) {
    let point = positions[index];
    if cell.population == 0 || cell.cell.gap_sq(point) > params.cutoff * params.cutoff {
        return;
    }

    if cell.is_leaf() {
        for &other in cell.members.iter().filter(|&&other| other != index) {
            *force += repulsion_between(index, other, point, positions[other], params);
        }
        return;
    }

    let delta = point - cell.centroid;
    let distance = delta.length().max(COINCIDENT_DISTANCE);
    if cell.summarizes_for(point, distance, theta) {
        if distance <= params.cutoff {
            let shifted = distance + params.epsilon;
            let weight = cell.population as f32;
            *force += (delta / distance) * ((params.strength * weight) / (shifted * shifted));
        }
        return;
    }

    for child in cell.children() {
        accumulate_repulsion_for_node(child, index, positions, params, theta, force);
    }
}

#[derive(Clone, Copy)]
pub(super) struct SpringParams {
    pub(super) stiffness: f32,
    pub(super) rest_length: f32,
}

pub(super) fn accumulate_springs(
    positions: &[Vec2],
    edges: &[(usize, usize)],
    params: SpringParams,
    forces: &mut [Vec2],
) {
    let node_count = positions.len();
    for &(from, to) in edges {
        if from >= node_count || to >= node_count || from == to {
            continue;
        }

        let delta = positions[to] - positions[from];
        let distance = delta.length();
        if distance <= COINCIDENT_DISTANCE {
            continue;
        }

        let pull = (delta / distance) * ((distance - params.rest_length) * params.stiffness);
        forces[from] += pull;
        forces[to] -= pull;
    }
}

pub(super) fn accumulate_anchor_pull(
    positions: &[Vec2],
    anchors: &[Vec2],
    strength: f32,
    forces: &mut [Vec2],
) {
    for ((force, position), anchor) in forces.iter_mut().zip(positions).zip(anchors) {
        *force += (*anchor - *position) * strength;
    }
}

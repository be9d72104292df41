use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};

use super::MapNode;
use crate::atlas::KnowledgeGraph;
use crate::util::stable_pair;

const CLUSTER_RING_RADIUS: f32 = 400.0;
const MEMBER_RING_RADIUS: f32 = 140.0;
const SEED_SPREAD: f32 = 160.0;

/// Cluster centers spaced evenly on a circle, in first-appearance order.
/// A lone cluster sits at the origin.
pub(in crate::app) fn cluster_anchors(graph: &KnowledgeGraph) -> HashMap<String, Vec2> {
    let keys = graph.cluster_keys();
    if keys.len() == 1 {
        return keys
            .into_iter()
            .map(|key| (key.to_owned(), Vec2::ZERO))
            .collect();
    }

    let count = keys.len() as f32;
    keys.into_iter()
        .enumerate()
        .map(|(slot, key)| (key.to_owned(), ring_point(slot as f32 / count, CLUSTER_RING_RADIUS)))
        .collect()
}

fn ring_point(fraction: f32, radius: f32) -> Vec2 {
    let angle = fraction * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin()) * radius
}

/// Initial simulation state: every node near its cluster anchor, offset by a
/// hash of its id so the same manifest always starts from the same layout.
pub(in crate::app) fn seed_nodes(graph: &KnowledgeGraph) -> Vec<MapNode> {
    let anchors = cluster_anchors(graph);
    graph
        .nodes
        .iter()
        .map(|document| {
            let anchor = anchors.get(&document.cluster).copied().unwrap_or(Vec2::ZERO);
            let (x, y) = stable_pair(&document.id);
            MapNode {
                world_pos: anchor + vec2(x, y) * SEED_SPREAD,
                velocity: Vec2::ZERO,
                anchor,
                radius: document.radius,
            }
        })
        .collect()
}

/// Static radial arrangement: members evenly spaced on a ring around their
/// cluster center.
pub(in crate::app) fn radial_positions(graph: &KnowledgeGraph) -> Vec<Vec2> {
    let anchors = cluster_anchors(graph);
    let mut members: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, document) in graph.nodes.iter().enumerate() {
        members.entry(document.cluster.as_str()).or_default().push(index);
    }

    let mut positions = vec![Vec2::ZERO; graph.node_count()];
    for (cluster, indices) in members {
        let center = anchors.get(cluster).copied().unwrap_or(Vec2::ZERO);
        if indices.len() == 1 {
            positions[indices[0]] = center;
            continue;
        }
        let count = indices.len() as f32;
        for (slot, index) in indices.into_iter().enumerate() {
            positions[index] = center + ring_point(slot as f32 / count, MEMBER_RING_RADIUS);
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::DocumentNode;

    fn graph() -> KnowledgeGraph {
        KnowledgeGraph::build(
            vec![
                DocumentNode::new("1", "Hub", Some("core".to_owned())),
                DocumentNode::new("2", "Research", Some("knowledge".to_owned())),
                DocumentNode::new("3", "Methods", Some("knowledge".to_owned())),
                DocumentNode::new("4", "Courses", Some("learning".to_owned())),
            ],
            None,
        )
    }

    #[test]
    fn anchors_sit_on_the_cluster_ring() {
        let anchors = cluster_anchors(&graph());
        assert_eq!(anchors.len(), 3);
        for anchor in anchors.values() {
            assert!((anchor.length() - CLUSTER_RING_RADIUS).abs() < 0.01);
        }
        assert!((anchors["core"] - vec2(CLUSTER_RING_RADIUS, 0.0)).length() < 0.01);
    }

    #[test]
    fn single_cluster_is_centered() {
        let graph = KnowledgeGraph::build(
            vec![
                DocumentNode::new("a", "A", None),
                DocumentNode::new("b", "B", None),
            ],
            None,
        );
        assert_eq!(cluster_anchors(&graph)["default"], Vec2::ZERO);
    }

    #[test]
    fn seeding_is_deterministic_and_near_anchor() {
        let graph = graph();
        let first = seed_nodes(&graph);
        let second = seed_nodes(&graph);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.world_pos, b.world_pos);
            assert!((a.world_pos - a.anchor).length() <= SEED_SPREAD * 2.0_f32.sqrt() + 0.01);
        }
    }

    #[test]
    fn radial_members_share_a_ring() {
        let graph = graph();
        let positions = radial_positions(&graph);
        let center = cluster_anchors(&graph)["knowledge"];
        for index in [1, 2] {
            assert!(((positions[index] - center).length() - MEMBER_RING_RADIUS).abs() < 0.01);
        }
        assert_ne!(positions[1], positions[2]);
        assert_eq!(positions[0], cluster_anchors(&graph)["core"]);
    }
}

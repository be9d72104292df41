use std::collections::HashMap;

use eframe::egui::Vec2;

use super::MapNode;
use crate::config::LodConfig;

pub(in crate::app) const AGGREGATE_RADIUS: f32 = 40.0;

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct Aggregate {
    pub centroid: Vec2,
    pub members: Vec<usize>,
}

impl Aggregate {
    pub(in crate::app) fn label(&self) -> String {
        format!("{} docs", self.members.len())
    }
}

/// One drawable, hit-testable thing on the map.
#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) enum Marker {
    Node(usize),
    Aggregate(Aggregate),
}

/// Per-frame view of the nodes, either one marker per node or grid-merged.
/// Never touches node data.
pub(in crate::app) struct LodView {
    markers: Vec<Marker>,
    marker_of: Vec<usize>,
    aggregated: bool,
}

impl LodView {
    pub(in crate::app) fn build(nodes: &[MapNode], zoom: f32, config: &LodConfig) -> Self {
        if config.enabled && zoom < config.zoom_threshold {
            Self::aggregate(nodes, config.cell_size)
        } else {
            Self::identity(nodes.len())
        }
    }

    pub(in crate::app) fn identity(node_count: usize) -> Self {
        Self {
            markers: (0..node_count).map(Marker::Node).collect(),
            marker_of: (0..node_count).collect(),
            aggregated: false,
        }
    }

    /// Groups nodes by `round(position / cell_size)`. Cells with a single
    /// member keep the node itself.
    pub(in crate::app) fn aggregate(nodes: &[MapNode], cell_size: f32) -> Self {
        let cell_size = cell_size.max(1.0);
        let mut cell_slots: HashMap<(i64, i64), usize> = HashMap::new();
        let mut cells: Vec<Vec<usize>> = Vec::new();

        for (index, node) in nodes.iter().enumerate() {
            let key = (
                (node.world_pos.x / cell_size).round() as i64,
                (node.world_pos.y / cell_size).round() as i64,
            );
            let slot = *cell_slots.entry(key).or_insert_with(|| {
                cells.push(Vec::new());
                cells.len() - 1
            });
            cells[slot].push(index);
        }

        let mut markers = Vec::with_capacity(cells.len());
        let mut marker_of = vec![0; nodes.len()];
        for members in cells {
            let marker_index = markers.len();
            for &member in &members {
                marker_of[member] = marker_index;
            }

            if let [only] = members.as_slice() {
                markers.push(Marker::Node(*only));
                continue;
            }

            let sum = members
                .iter()
                .fold(Vec2::ZERO, |sum, &member| sum + nodes[member].world_pos);
            markers.push(Marker::Aggregate(Aggregate {
                centroid: sum / members.len() as f32,
                members,
            }));
        }

        Self {
            markers,
            marker_of,
            aggregated: true,
        }
    }

    pub(in crate::app) fn is_aggregated(&self) -> bool {
        self.aggregated
    }

    pub(in crate::app) fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub(in crate::app) fn marker(&self, index: usize) -> Option<&Marker> {
        self.markers.get(index)
    }

    pub(in crate::app) fn marker_of(&self, node: usize) -> Option<usize> {
        self.marker_of.get(node).copied()
    }

    pub(in crate::app) fn position(&self, marker: &Marker, nodes: &[MapNode]) -> Vec2 {
        match marker {
            Marker::Node(index) => nodes.get(*index).map_or(Vec2::ZERO, |node| node.world_pos),
            Marker::Aggregate(aggregate) => aggregate.centroid,
        }
    }

    pub(in crate::app) fn radius(&self, marker: &Marker, nodes: &[MapNode]) -> f32 {
        match marker {
            Marker::Node(index) => nodes.get(*index).map_or(0.0, |node| node.radius),
            Marker::Aggregate(_) => AGGREGATE_RADIUS,
        }
    }

    /// Node edges projected onto markers: intra-marker edges vanish and
    /// parallel ones collapse into one.
    pub(in crate::app) fn marker_edges(&self, edges: &[(usize, usize)]) -> Vec<(usize, usize)> {
        let mut projected = edges
            .iter()
            .filter_map(|&(from, to)| {
                let a = self.marker_of(from)?;
                let b = self.marker_of(to)?;
                (a != b).then_some((a.min(b), a.max(b)))
            })
            .collect::<Vec<_>>();
        projected.sort_unstable();
        projected.dedup();
        projected
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn nodes(positions: &[(f32, f32)]) -> Vec<MapNode> {
        positions
            .iter()
            .map(|&(x, y)| MapNode {
                world_pos: vec2(x, y),
                velocity: Vec2::ZERO,
                anchor: Vec2::ZERO,
                radius: 28.0,
            })
            .collect()
    }

    #[test]
    fn above_threshold_every_node_is_its_own_marker() {
        let nodes = nodes(&[(0.0, 0.0), (10.0, 0.0)]);
        let view = LodView::build(&nodes, 1.0, &LodConfig::default());
        assert!(!view.is_aggregated());
        assert_eq!(view.markers(), &[Marker::Node(0), Marker::Node(1)]);
    }

    #[test]
    fn close_nodes_merge_into_centroid_marker() {
        let nodes = nodes(&[(0.0, 0.0), (100.0, 50.0), (1000.0, 1000.0)]);
        let view = LodView::build(&nodes, 0.4, &LodConfig::default());
        assert!(view.is_aggregated());
        assert_eq!(view.markers().len(), 2);

        let Marker::Aggregate(aggregate) = &view.markers()[0] else {
            panic!("expected aggregate marker");
        };
        assert_eq!(aggregate.members, vec![0, 1]);
        assert_eq!(aggregate.centroid, vec2(50.0, 25.0));
        assert_eq!(aggregate.label(), "2 docs");
        assert_eq!(view.markers()[1], Marker::Node(2));
        assert_eq!(view.radius(&view.markers()[0], &nodes), AGGREGATE_RADIUS);
    }

    #[test]
    fn marker_edges_drop_internal_and_duplicate_links() {
        let nodes = nodes(&[(0.0, 0.0), (20.0, 0.0), (2000.0, 0.0), (2010.0, 0.0)]);
        let view = LodView::aggregate(&nodes, 400.0);
        let edges = [(0, 1), (0, 2), (1, 3), (2, 3), (0, 99)];
        assert_eq!(view.marker_edges(&edges), vec![(0, 1)]);
    }
}

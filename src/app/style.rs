use std::collections::HashMap;

use eframe::egui::Color32;

use crate::atlas::{DEFAULT_CLUSTER, KnowledgeGraph};

pub(in crate::app) const AGGREGATE_FILL: Color32 = Color32::from_rgb(0x94, 0xa3, 0xb8);
const FALLBACK_FILL: Color32 = Color32::from_rgb(0xcb, 0xd5, 0xe1);

const KNOWN_CLUSTERS: [(&str, Color32); 4] = [
    ("core", Color32::from_rgb(0xfd, 0xe6, 0x8a)),
    ("knowledge", Color32::from_rgb(0x93, 0xc5, 0xfd)),
    ("learning", Color32::from_rgb(0x86, 0xef, 0xac)),
    ("analysis", Color32::from_rgb(0xfc, 0xa5, 0xa5)),
];

const PALETTE: [Color32; 6] = [
    Color32::from_rgb(0x10, 0xb9, 0x81),
    Color32::from_rgb(0xf5, 0x9e, 0x0b),
    Color32::from_rgb(0xef, 0x44, 0x44),
    Color32::from_rgb(0x8b, 0x5c, 0xf6),
    Color32::from_rgb(0x25, 0x63, 0xeb),
    Color32::from_rgb(0xec, 0x48, 0x99),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct ClusterStyle {
    pub fill: Color32,
    pub outline: Color32,
}

impl ClusterStyle {
    fn from_fill(fill: Color32) -> Self {
        Self {
            fill,
            outline: super::render_utils::dim_color(fill, 0.55),
        }
    }
}

/// Explicit cluster key to style mapping. Known keys have fixed colours,
/// other keys take palette slots in sorted order, anything else is neutral.
pub(in crate::app) struct StyleTable {
    by_cluster: HashMap<String, ClusterStyle>,
    fallback: ClusterStyle,
}

impl StyleTable {
    pub(in crate::app) fn for_graph(graph: &KnowledgeGraph) -> Self {
        let mut by_cluster = KNOWN_CLUSTERS
            .iter()
            .map(|(key, fill)| ((*key).to_owned(), ClusterStyle::from_fill(*fill)))
            .collect::<HashMap<_, _>>();

        let mut unknown = graph
            .cluster_keys()
            .into_iter()
            .filter(|key| *key != DEFAULT_CLUSTER && !by_cluster.contains_key(*key))
            .collect::<Vec<_>>();
        unknown.sort_unstable();

        for (slot, key) in unknown.into_iter().enumerate() {
            let fill = PALETTE[slot % PALETTE.len()];
            by_cluster.insert(key.to_owned(), ClusterStyle::from_fill(fill));
        }

        Self {
            by_cluster,
            fallback: ClusterStyle::from_fill(FALLBACK_FILL),
        }
    }

    pub(in crate::app) fn style(&self, cluster: &str) -> ClusterStyle {
        self.by_cluster.get(cluster).copied().unwrap_or(self.fallback)
    }
}

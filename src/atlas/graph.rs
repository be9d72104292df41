use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

pub const DEFAULT_CLUSTER: &str = "default";
pub const DEFAULT_NODE_RADIUS: f32 = 28.0;

/// Payload shown in the detail panel when a node is selected.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeContent {
    Inline(String),
    Fragment(PathBuf),
}

#[derive(Clone, Debug)]
pub struct DocumentNode {
    pub id: String,
    pub label: String,
    pub cluster: String,
    pub tags: Vec<String>,
    pub radius: f32,
    pub layer: Option<u32>,
    pub content: NodeContent,
}

impl DocumentNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>, cluster: Option<String>) -> Self {
        let id = id.into();
        let label = label.into();
        let label = if label.trim().is_empty() {
            id.clone()
        } else {
            label
        };

        Self {
            content: NodeContent::Inline(label.clone()),
            id,
            label,
            cluster: cluster
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CLUSTER.to_owned()),
            tags: Vec::new(),
            radius: DEFAULT_NODE_RADIUS,
            layer: None,
        }
    }
}

/// How edges were derived for a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgePolicy {
    Explicit,
    ClusterClique,
}

/// Immutable node/edge set produced by one ingestion run.
///
/// Edges are stored once per unordered pair as `(low, high)` node indices;
/// `adjacency` holds both directions so neighbourhood lookups are symmetric.
#[derive(Clone, Debug)]
pub struct KnowledgeGraph {
    pub nodes: Vec<DocumentNode>,
    pub edges: Vec<(usize, usize)>,
    pub index_by_id: HashMap<String, usize>,
    pub adjacency: Vec<Vec<usize>>,
    pub edge_policy: EdgePolicy,
    pub dropped_edges: usize,
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::build(Vec::new(), None)
    }
}

impl KnowledgeGraph {
    /// Builds the graph from documents and optional explicit links.
    ///
    /// `None` links falls back to connecting every pair inside a cluster.
    /// Links naming unknown ids or looping on one node are dropped.
    pub fn build(documents: Vec<DocumentNode>, links: Option<Vec<(String, String)>>) -> Self {
        let mut nodes = Vec::with_capacity(documents.len());
        let mut index_by_id = HashMap::with_capacity(documents.len());
        for document in documents {
            if index_by_id.contains_key(&document.id) {
                tracing::warn!(id = %document.id, "skipping document with duplicate id");
                continue;
            }
            index_by_id.insert(document.id.clone(), nodes.len());
            nodes.push(document);
        }

        let mut pairs = HashSet::new();
        let mut dropped_edges = 0usize;
        let edge_policy = match links {
            Some(links) => {
                for (from, to) in links {
                    match (index_by_id.get(&from), index_by_id.get(&to)) {
                        (Some(&a), Some(&b)) if a != b => {
                            pairs.insert((a.min(b), a.max(b)));
                        }
                        _ => dropped_edges += 1,
                    }
                }
                EdgePolicy::Explicit
            }
            None => {
                let mut members: HashMap<&str, Vec<usize>> = HashMap::new();
                for (index, node) in nodes.iter().enumerate() {
                    members.entry(node.cluster.as_str()).or_default().push(index);
                }
                for indices in members.values() {
                    for (offset, &a) in indices.iter().enumerate() {
                        for &b in &indices[offset + 1..] {
                            pairs.insert((a.min(b), a.max(b)));
                        }
                    }
                }
                EdgePolicy::ClusterClique
            }
        };

        if dropped_edges > 0 {
            tracing::debug!(dropped_edges, "dropped links with unresolved endpoints");
        }

        let mut edges = pairs.into_iter().collect::<Vec<_>>();
        edges.sort_unstable();

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for &(a, b) in &edges {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
        }

        Self {
            nodes,
            edges,
            index_by_id,
            adjacency,
            edge_policy,
            dropped_edges,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.adjacency.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn are_connected(&self, a: usize, b: usize) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    /// Cluster keys in order of first appearance.
    pub fn cluster_keys(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .map(|node| node.cluster.as_str())
            .filter(|key| seen.insert(*key))
            .collect()
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use super::error::IngestError;
use super::graph::KnowledgeGraph;
use super::manifest::{ManifestError, parse_manifest};
use super::table::parse_table;

/// Where ingestion looks for content. The table is only consulted when the
/// manifest is not configured or cannot be read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceSet {
    pub manifest: Option<PathBuf>,
    pub table: Option<PathBuf>,
}

/// Outcome of one ingestion run. Failures still produce a (possibly empty)
/// graph so the map stays interactive.
#[derive(Debug)]
pub struct Ingestion {
    pub graph: KnowledgeGraph,
    pub warning: Option<String>,
}

pub fn load_knowledge_graph(sources: &SourceSet) -> Result<KnowledgeGraph, IngestError> {
    let manifest_error = match &sources.manifest {
        Some(path) => match load_manifest(path) {
            Ok(graph) => return Ok(graph),
            Err(error @ IngestError::Read { .. }) => Some(error),
            Err(error) => return Err(error),
        },
        None => None,
    };

    match (&sources.table, manifest_error) {
        (Some(table), previous) => {
            if let Some(previous) = previous {
                tracing::info!(%previous, table = %table.display(), "manifest unavailable, using table");
            }
            load_table(table)
        }
        (None, Some(error)) => Err(error),
        (None, None) => Err(IngestError::NoSource),
    }
}

pub fn ingest(sources: &SourceSet) -> Ingestion {
    match load_knowledge_graph(sources) {
        Ok(graph) => {
            tracing::info!(
                nodes = graph.node_count(),
                edges = graph.edges.len(),
                policy = ?graph.edge_policy,
                "ingested knowledge graph"
            );
            Ingestion {
                graph,
                warning: None,
            }
        }
        Err(error) => {
            tracing::warn!(%error, "ingestion failed, showing an empty map");
            Ingestion {
                graph: KnowledgeGraph::default(),
                warning: Some(error.to_string()),
            }
        }
    }
}

fn read_source(path: &Path) -> Result<String, IngestError> {
    fs::read_to_string(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_manifest(path: &Path) -> Result<KnowledgeGraph, IngestError> {
    let raw = read_source(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_manifest(&raw, base_dir).map_err(|error| match error {
        ManifestError::Json(source) => IngestError::Parse {
            path: path.to_path_buf(),
            source,
        },
        ManifestError::Shape => IngestError::Shape {
            path: path.to_path_buf(),
        },
    })
}

fn load_table(path: &Path) -> Result<KnowledgeGraph, IngestError> {
    let graph = parse_table(&read_source(path)?);
    if graph.is_empty() {
        return Err(IngestError::EmptyTable {
            path: path.to_path_buf(),
        });
    }
    Ok(graph)
}

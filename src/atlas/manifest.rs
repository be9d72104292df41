use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::graph::{DEFAULT_NODE_RADIUS, DocumentNode, KnowledgeGraph, NodeContent};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_key(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct RawDocument {
    id: RawId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    cluster: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    fragment: Option<String>,
    #[serde(default)]
    connections: Option<Vec<RawId>>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    size: Option<f32>,
    #[serde(default)]
    layer: Option<u32>,
}

/// Failure modes for [`parse_manifest`]; the caller attaches the path.
#[derive(Debug, Error)]
pub(super) enum ManifestError {
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("expected a document list or an object with `documents`")]
    Shape,
}

/// Parses manifest JSON into a graph.
///
/// Accepts either `{ "documents": [...], "connections": [[a, b], ...] }` or a
/// bare document array. Document entries that fail to deserialize are skipped.
/// Relative fragment paths resolve against `base_dir`.
pub(super) fn parse_manifest(raw: &str, base_dir: &Path) -> Result<KnowledgeGraph, ManifestError> {
    let parsed: Value = serde_json::from_str(raw).map_err(ManifestError::Json)?;

    let (document_values, top_level_links) = match &parsed {
        Value::Array(items) => (items.as_slice(), None),
        Value::Object(object) => {
            let documents = match object.get("documents") {
                Some(Value::Array(items)) => items.as_slice(),
                Some(_) => return Err(ManifestError::Shape),
                None => &[],
            };
            let links = object.get("connections").map(parse_pairs);
            (documents, links)
        }
        _ => return Err(ManifestError::Shape),
    };

    let mut documents = Vec::with_capacity(document_values.len());
    let mut links = top_level_links.unwrap_or_default();
    let mut has_explicit_links = parsed
        .as_object()
        .is_some_and(|object| object.contains_key("connections"));

    for value in document_values {
        let raw = match RawDocument::deserialize(value) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(%error, "skipping malformed manifest document");
                continue;
            }
        };

        let id = raw.id.clone().into_key();
        if let Some(connections) = raw.connections.clone() {
            has_explicit_links = true;
            links.extend(
                connections
                    .into_iter()
                    .map(|target| (id.clone(), target.into_key())),
            );
        }
        documents.push(document_from_raw(id, raw, base_dir));
    }

    let links = if has_explicit_links { Some(links) } else { None };
    Ok(KnowledgeGraph::build(documents, links))
}

fn parse_pairs(value: &Value) -> Vec<(String, String)> {
    let Some(items) = value.as_array() else {
        tracing::warn!("ignoring top-level connections that are not a list");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match <(RawId, RawId)>::deserialize(item) {
            Ok((a, b)) => Some((a.into_key(), b.into_key())),
            Err(error) => {
                tracing::warn!(%error, "skipping malformed connection pair");
                None
            }
        })
        .collect()
}

fn document_from_raw(id: String, raw: RawDocument, base_dir: &Path) -> DocumentNode {
    let label = raw.title.or(raw.label).unwrap_or_default();
    let cluster = raw.cluster.or(raw.kind);
    let mut node = DocumentNode::new(id, label, cluster);

    let inline = raw
        .content
        .or(raw.summary)
        .filter(|text| !text.trim().is_empty());
    node.content = match (inline, raw.fragment, raw.path) {
        (Some(text), _, _) => NodeContent::Inline(text),
        (None, Some(fragment), _) => {
            NodeContent::Fragment(base_dir.join("fragments").join(fragment))
        }
        (None, None, Some(path)) => NodeContent::Fragment(base_dir.join(path)),
        (None, None, None) => NodeContent::Fragment(
            base_dir
                .join("fragments")
                .join(format!("frag-{}.html", node.id)),
        ),
    };

    node.tags = raw.tags;
    node.radius = raw
        .size
        .filter(|size| size.is_finite() && *size > 0.0)
        .unwrap_or(DEFAULT_NODE_RADIUS);
    node.layer = raw.layer;
    node
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use serde_json::{Map, Value};

use super::camera::CameraSnapshot;

const CAMERA_KEY: &str = "atlas.camera";
const NODE_BOOKMARKS_KEY: &str = "atlasBookmarks";
const TRAIL_SEPARATOR: &str = " → ";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) struct BreadcrumbEntry {
    pub node_id: String,
    pub label: String,
}

/// Append-only trail of selected nodes for the current session.
#[derive(Default)]
pub(in crate::app) struct Breadcrumb {
    entries: Vec<BreadcrumbEntry>,
}

impl Breadcrumb {
    pub(in crate::app) fn push(&mut self, node_id: &str, label: &str) {
        self.entries.push(BreadcrumbEntry {
            node_id: node_id.to_owned(),
            label: label.to_owned(),
        });
    }

    pub(in crate::app) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(in crate::app) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(in crate::app) fn recent(&self, limit: usize) -> &[BreadcrumbEntry] {
        let start = self.entries.len().saturating_sub(limit);
        &self.entries[start..]
    }

    pub(in crate::app) fn trail(&self, limit: usize) -> String {
        self.recent(limit)
            .iter()
            .map(|entry| entry.label.as_str())
            .collect::<Vec<_>>()
            .join(TRAIL_SEPARATOR)
    }

    pub(in crate::app) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Camera snapshot and bookmarked node labels, kept in one JSON file.
pub(in crate::app) struct BookmarkStore {
    path: Option<PathBuf>,
    camera: Option<CameraSnapshot>,
    labels: Vec<String>,
}

impl BookmarkStore {
    pub(in crate::app) fn default_path() -> Option<PathBuf> {
        let proj = ProjectDirs::from("", "", "cognitive-atlas")?;
        Some(proj.data_dir().join("bookmarks.json"))
    }

    pub(in crate::app) fn in_memory() -> Self {
        Self {
            path: None,
            camera: None,
            labels: Vec::new(),
        }
    }

    /// Reads the store at `path`. Missing files start empty; malformed
    /// entries are dropped individually.
    pub(in crate::app) fn open(path: PathBuf) -> Self {
        let mut store = Self {
            path: Some(path),
            ..Self::in_memory()
        };
        let Some(path) = store.path.as_deref() else {
            return store;
        };
        let Ok(contents) = fs::read_to_string(path) else {
            return store;
        };

        let root = match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(root)) => root,
            Ok(_) => {
                tracing::warn!(path = %path.display(), "ignoring bookmark file without an object root");
                return store;
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "ignoring malformed bookmark file");
                return store;
            }
        };

        store.camera = parse_camera(&root, path);
        store.labels = parse_labels(&root, path);
        store
    }

    pub(in crate::app) fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(in crate::app) fn camera(&self) -> Option<CameraSnapshot> {
        self.camera
    }

    pub(in crate::app) fn save_camera(&mut self, snapshot: CameraSnapshot) -> anyhow::Result<()> {
        self.camera = Some(snapshot);
        self.persist()
    }

    pub(in crate::app) fn labels(&self) -> &[String] {
        &self.labels
    }

    pub(in crate::app) fn contains_label(&self, label: &str) -> bool {
        self.labels.iter().any(|existing| existing == label)
    }

    /// Returns `false` when the label was already bookmarked.
    pub(in crate::app) fn add_label(&mut self, label: &str) -> anyhow::Result<bool> {
        if self.contains_label(label) {
            return Ok(false);
        }
        self.labels.push(label.to_owned());
        self.persist()?;
        Ok(true)
    }

    pub(in crate::app) fn remove_label(&mut self, label: &str) -> anyhow::Result<()> {
        let before = self.labels.len();
        self.labels.retain(|existing| existing != label);
        if self.labels.len() != before {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> anyhow::Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let mut root = Map::new();
        if let Some(camera) = self.camera {
            root.insert(
                CAMERA_KEY.to_owned(),
                serde_json::to_value(camera).context("failed to encode camera snapshot")?,
            );
        }
        root.insert(
            NODE_BOOKMARKS_KEY.to_owned(),
            Value::Array(self.labels.iter().cloned().map(Value::String).collect()),
        );

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create bookmark directory {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(&Value::Object(root))
            .context("failed to encode bookmarks")?;
        fs::write(path, data)
            .with_context(|| format!("failed to write bookmarks {}", path.display()))?;
        Ok(())
    }
}

fn parse_camera(root: &Map<String, Value>, path: &Path) -> Option<CameraSnapshot> {
    let value = root.get(CAMERA_KEY)?;
    match serde_json::from_value::<CameraSnapshot>(value.clone()) {
        Ok(snapshot) => Some(snapshot),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "ignoring malformed camera bookmark");
            None
        }
    }
}

fn parse_labels(root: &Map<String, Value>, path: &Path) -> Vec<String> {
    let Some(value) = root.get(NODE_BOOKMARKS_KEY) else {
        return Vec::new();
    };
    let Some(items) = value.as_array() else {
        tracing::warn!(path = %path.display(), "ignoring malformed node bookmarks");
        return Vec::new();
    };

    let mut labels: Vec<String> = Vec::new();
    for label in items.iter().filter_map(Value::as_str) {
        if !labels.iter().any(|existing| existing == label) {
            labels.push(label.to_owned());
        }
    }
    labels
}

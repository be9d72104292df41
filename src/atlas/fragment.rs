use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{Context, Result};

pub const FRAGMENT_NOT_FOUND: &str = "Fragment not found";

const BLOCK_TAGS: [&str; 12] = [
    "p", "br", "div", "li", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "hr",
];

pub fn read_fragment(path: &Path) -> Result<String> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("failed to read fragment {}", path.display()))?;
    Ok(html_to_text(&html))
}

/// Flattens an HTML snippet to readable text: tags dropped, block tags become
/// line breaks, common entities decoded, runs of blank space collapsed.
pub fn html_to_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('>') else {
            rest = &rest[open..];
            break;
        };

        let tag = rest[open + 1..open + close]
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if BLOCK_TAGS.contains(&tag.as_str()) {
            text.push('\n');
        }
        rest = &rest[open + close + 1..];
    }
    text.push_str(rest);

    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FragmentState {
    Ready(String),
    Loading,
}

struct PendingFragment {
    path: PathBuf,
    rx: Receiver<Result<String, String>>,
}

/// Loads fragment files off the UI thread and caches them per path.
///
/// Only the most recent request is kept; a superseded request's result is
/// dropped with its channel and never reaches the cache.
#[derive(Default)]
pub struct FragmentLoader {
    cache: HashMap<PathBuf, String>,
    pending: Option<PendingFragment>,
}

impl FragmentLoader {
    pub fn request(&mut self, path: &Path) -> FragmentState {
        if let Some(text) = self.cache.get(path) {
            self.pending = None;
            return FragmentState::Ready(text.clone());
        }

        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.path == path)
        {
            return FragmentState::Loading;
        }

        let (tx, rx) = mpsc::channel();
        let owned = path.to_path_buf();
        thread::spawn(move || {
            let result = read_fragment(&owned).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        self.pending = Some(PendingFragment {
            path: path.to_path_buf(),
            rx,
        });
        FragmentState::Loading
    }

    /// Collects a finished load. Failures resolve to the not-found placeholder
    /// without being cached, so a later request retries the read.
    pub fn poll(&mut self) -> Option<(PathBuf, String)> {
        let pending = self.pending.as_ref()?;
        let result = match pending.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err("fragment loader disconnected".to_owned()),
        };

        let pending = self.pending.take()?;
        match result {
            Ok(text) => {
                self.cache.insert(pending.path.clone(), text.clone());
                Some((pending.path, text))
            }
            Err(error) => {
                tracing::warn!(path = %pending.path.display(), %error, "fragment unavailable");
                Some((pending.path, FRAGMENT_NOT_FOUND.to_owned()))
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Text of an already loaded fragment. Never starts a read.
    pub fn cached(&self, path: &Path) -> Option<&str> {
        self.cache.get(path).map(String::as_str)
    }
}

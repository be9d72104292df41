use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use eframe::egui::{Context, Vec2};

use crate::atlas::{Ingestion, SourceSet, ingest};
use crate::config::AtlasConfig;

mod camera;
mod exploration;
mod graph;
mod history;
mod interaction;
mod lod;
mod physics;
mod placement;
mod render_utils;
mod session;
mod style;
mod ui;

use history::BookmarkStore;
use session::AtlasSession;
use ui::DetailsPane;

/// Everything the window needs at startup.
pub struct LaunchOptions {
    pub sources: SourceSet,
    pub config: AtlasConfig,
    pub config_path: Option<PathBuf>,
}

pub struct AtlasApp {
    sources: SourceSet,
    generation: u64,
    state: AppState,
    model: Box<ViewModel>,
}

enum AppState {
    Loading { rx: Receiver<(u64, Ingestion)> },
    Ready,
}

struct ViewModel {
    session: AtlasSession,
    config: AtlasConfig,
    config_path: Option<PathBuf>,
    details: DetailsPane,
    bookmarks: BookmarkStore,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    graph_revision: u64,
    bookmark_on_select: bool,
    loaded: bool,
    ingest_warning: Option<String>,
    status_message: Option<String>,
    visible_marker_count: usize,
    visible_edge_count: usize,
}

struct SearchMatchCache {
    query: String,
    graph_revision: u64,
    matches: Arc<HashSet<usize>>,
}

/// Simulation state of one node. Index-aligned with the graph's documents.
#[derive(Clone, Debug)]
struct MapNode {
    world_pos: Vec2,
    velocity: Vec2,
    anchor: Vec2,
    radius: f32,
}

impl AtlasApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, options: LaunchOptions) -> Self {
        let bookmarks = match BookmarkStore::default_path() {
            Some(path) => BookmarkStore::open(path),
            None => {
                tracing::warn!("no data directory available, bookmarks stay in memory");
                BookmarkStore::in_memory()
            }
        };
        let model = ViewModel::new(options.config, options.config_path, bookmarks);

        let mut app = Self {
            sources: options.sources,
            generation: 0,
            state: AppState::Ready,
            model: Box::new(model),
        };
        app.start_load();
        app
    }

    fn spawn_load(sources: SourceSet, generation: u64) -> Receiver<(u64, Ingestion)> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let ingestion = ingest(&sources);
            let _ = tx.send((generation, ingestion));
        });

        rx
    }

    /// Starts a new ingestion. A load already in flight is superseded and
    /// its result discarded.
    fn start_load(&mut self) {
        self.generation += 1;
        tracing::info!(generation = self.generation, "starting ingestion");
        self.state = AppState::Loading {
            rx: Self::spawn_load(self.sources.clone(), self.generation),
        };
    }
}

impl eframe::App for AtlasApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        if let AppState::Loading { rx } = &self.state {
            match rx.try_recv() {
                Ok((generation, ingestion)) => {
                    if generation == self.generation {
                        self.model.apply_ingestion(ingestion);
                    } else {
                        tracing::debug!(generation, "discarding superseded ingestion");
                    }
                    transition = Some(AppState::Ready);
                }
                Err(TryRecvError::Empty) => {
                    ctx.request_repaint_after(Duration::from_millis(50));
                }
                Err(TryRecvError::Disconnected) => {
                    self.model.apply_ingestion(Ingestion {
                        graph: Default::default(),
                        warning: Some("Background load worker disconnected".to_owned()),
                    });
                    transition = Some(AppState::Ready);
                }
            }
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }

        let mut reload_requested = false;
        let is_loading = matches!(self.state, AppState::Loading { .. });
        self.model.show(ctx, &mut reload_requested, is_loading);

        if reload_requested {
            self.start_load();
        }
    }
}

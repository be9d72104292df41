mod app;
mod atlas;
mod config;
mod util;

use std::path::PathBuf;

use clap::Parser;

use crate::atlas::SourceSet;
use crate::config::LayoutMode;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Content manifest (`documents` plus optional `connections`).
    #[arg(long, default_value = "acervo/manifest.json")]
    manifest: PathBuf,

    /// Tabular fallback used when the manifest cannot be read.
    #[arg(long)]
    table: Option<PathBuf>,

    /// Layout mode, overriding the config file.
    #[arg(long, value_enum)]
    mode: Option<LayoutMode>,

    /// Config file. Defaults to the per-user config directory.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> eframe::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let args = Args::parse();
    let mut config = config::load_or_default(args.config.as_deref());
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    tracing::info!(manifest = %args.manifest.display(), mode = config.mode.label(), "starting atlas");

    let launch = app::LaunchOptions {
        sources: SourceSet {
            manifest: Some(args.manifest),
            table: args.table,
        },
        config,
        config_path: args.config,
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Cognitive Atlas",
        options,
        Box::new(move |cc| Ok(Box::new(app::AtlasApp::new(cc, launch)))),
    )
}

mod app;

use std::path::PathBuf;

use clap::Parser;
use repo_atlas::layout::LayoutMode;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph JSON: `{nodes, edges}` or a rooted tree.
    #[arg(long)]
    graph: PathBuf,
    /// Path trace `{path, links}` highlighted once the graph is loaded.
    #[arg(long)]
    trace: Option<PathBuf>,
    /// Engine tunables; every field is optional.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = LayoutMode::Hierarchical)]
    mode: LayoutMode,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repo_atlas=info".into()),
        )
        .init();

    let args = Args::parse();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };
    let sources = app::Sources {
        graph: args.graph,
        trace: args.trace,
        config: args.config,
    };

    eframe::run_native(
        "repo-atlas",
        options,
        Box::new(move |cc| Ok(Box::new(app::AtlasApp::new(cc, sources, args.mode)))),
    )
}

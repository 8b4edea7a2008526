mod demo;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use blockwire_engine::{EngineOptions, RuntimeSummary, launch_with_options, load_graph_file};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Resolve, run, and release Blockwire graphs.
#[derive(Parser, Debug)]
#[command(name = "blockwire", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Resolve a graph, start it, print its node summary as JSON, and release it
    Run {
        /// Path to a YAML or JSON graph document
        #[arg(env = "BLOCKWIRE_GRAPH")]
        file: PathBuf,

        /// Resolve and wire only; skip starting startable values
        #[arg(long)]
        no_start: bool,
    },
    /// Load and validate a graph document without resolving it
    Check {
        /// Path to a YAML or JSON graph document
        #[arg(env = "BLOCKWIRE_GRAPH")]
        file: PathBuf,
    },
}

/// Result of `blockwire check`.
#[derive(Debug, Serialize)]
struct CheckSummary {
    nodes: usize,
    constants: usize,
    dependent: usize,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run { file, no_start } => {
            let summary = run_graph(&file, !no_start)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Check { file } => {
            let summary = check_graph(&file)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_graph(file: &Path, start: bool) -> Result<RuntimeSummary> {
    let graph = load_graph_file(file)?;
    let registry = Arc::new(demo::demo_registry());
    let options = EngineOptions { start_on_launch: start };
    let mut app = launch_with_options(&graph, registry, options).with_context(|| format!("failed to launch {}", file.display()))?;
    let summary = app.summary();
    app.close().with_context(|| format!("failed to release {}", file.display()))?;
    info!(path = %file.display(), nodes = summary.nodes.len(), "graph run complete");
    Ok(summary)
}

fn check_graph(file: &Path) -> Result<CheckSummary> {
    let graph = load_graph_file(file)?;
    Ok(CheckSummary {
        nodes: graph.len(),
        constants: graph.nodes().filter(|node| node.is_constant()).count(),
        dependent: graph.nodes().filter(|node| node.is_dependent()).count(),
    })
}

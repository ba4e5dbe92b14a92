//! Framegraph Server
//!
//! Runs the compositing graph: loads the saved graph, ticks it on a render
//! thread, and accepts editor connections over WebSocket until interrupted.
//! On shutdown the graph is written back to the same file.

mod settings;

use std::fs;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use framegraph_core::graph::{GraphManager, NodeRegistry};
use framegraph_core::scheduler::RenderLoop;
use framegraph_core::transport::ControlServer;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::{Overrides, Settings};

#[derive(Parser, Debug)]
#[command(name = "framegraph")]
#[command(about = "Real-time compositing graph server")]
struct Cli {
    /// JSON settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Address for the WebSocket control endpoint
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Render ticks per second
    #[arg(long)]
    frame_rate: Option<f64>,

    /// Graph file loaded at startup and saved on shutdown
    #[arg(long)]
    graph: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "framegraph=info,framegraph_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = Settings::resolve(
        cli.settings.as_deref(),
        Overrides {
            listen: cli.listen,
            frame_rate: cli.frame_rate,
            graph_file: cli.graph,
        },
    )?;

    let registry = Arc::new(NodeRegistry::with_builtin_nodes());
    info!(
        "Registered node types: {}",
        registry.type_names().collect::<Vec<_>>().join(", ")
    );
    let graph = Arc::new(GraphManager::new(registry));

    if let Some(path) = &settings.graph_file {
        load_graph(&graph, path)?;
    }

    let render = RenderLoop::spawn(Arc::clone(&graph), settings.frame_rate)?;

    let listener = TcpListener::bind(settings.listen)
        .await
        .with_context(|| format!("failed to bind {}", settings.listen))?;
    let server = ControlServer::new(Arc::clone(&graph));
    server
        .serve(listener, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {err}");
            }
        })
        .await?;

    graph.clear_adapters();
    render.stop();

    if let Some(path) = &settings.graph_file {
        save_graph(&graph, path)?;
    }
    graph.clear();

    Ok(())
}

fn load_graph(graph: &GraphManager, path: &Path) -> anyhow::Result<()> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("No graph at {}, starting empty", path.display());
            return Ok(());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    let document: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let report = graph.set_config_json(&document)?;

    info!(
        "Loaded {} nodes and {} connections from {}",
        report.nodes_added,
        report.connections_added,
        path.display()
    );
    for err in &report.rejected {
        warn!("Skipped graph entry: {err}");
    }

    Ok(())
}

fn save_graph(graph: &GraphManager, path: &Path) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(&graph.get_config())?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Saved graph to {}", path.display());
    Ok(())
}

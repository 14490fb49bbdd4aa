//! Tracer server
//!
//! HTTP backend for the reading tracker: per-user book records with
//! reading progress and notes, plus catalog suggestions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tracer_core::{Config, StoreBackend};

mod app;
mod error;
mod handlers;

use app::AppState;

#[derive(Parser)]
#[command(name = "tracer")]
#[command(about = "Tracer - reading progress server")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/tracer/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(short, long)]
    bind: Option<String>,

    /// Keep books in memory only
    #[arg(long)]
    memory: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("TRACER_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::load().context("Failed to load config")?,
    };
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if cli.memory {
        config.store = StoreBackend::Memory;
    }

    let state = AppState::from_config(&config)?;
    match config.store {
        StoreBackend::Sqlite => info!("Using database at {:?}", config.sqlite_path()),
        StoreBackend::Memory => info!("Using in-memory store; books are lost on exit"),
    }
    info!("Catalog suggestions from {}", state.suggestions.endpoint());

    let router = app::router(state, &config)?;

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Tracer listening on {}", config.bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Tracer stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

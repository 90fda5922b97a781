//! Tune Terminal Dispatcher (tt-dispatch) - Main entry point
//!
//! Loads the tune catalog, restores favorites and saved collections from the
//! root folder database, and serves the set engine over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tt_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use tt_common::db::init_database;
use tt_dispatch::catalog::load_catalog;
use tt_dispatch::config::{DispatchConfig, Overrides};
use tt_dispatch::{build_router, AppContext, SetEngine, SharedState};

/// Command-line arguments for tt-dispatch
#[derive(Parser, Debug)]
#[command(name = "tt-dispatch")]
#[command(about = "Tune set recommendation service")]
#[command(version)]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root folder holding the database (overrides TT_ROOT_FOLDER)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Catalog JSON file path or http(s) URL
    #[arg(long, env = "TT_CATALOG")]
    catalog: Option<String>,

    /// Listen address
    #[arg(short, long, env = "TT_BIND")]
    bind: Option<String>,

    /// Initial cohesion mode (strict, medium, creative)
    #[arg(short, long)]
    mode: Option<String>,

    /// Delay before a spin becomes final, in milliseconds
    #[arg(long)]
    settle_delay_ms: Option<u64>,

    /// Delay before an appended tune becomes final, in milliseconds
    #[arg(long)]
    extend_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml = TomlConfig::load_or_default(args.config.as_deref());
    let config = DispatchConfig::resolve(
        &toml,
        Overrides {
            catalog: args.catalog,
            bind: args.bind,
            mode: args.mode,
            settle_delay_ms: args.settle_delay_ms,
            extend_delay_ms: args.extend_delay_ms,
        },
    )
    .context("Invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tune Terminal Dispatcher v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = RootFolderResolver::new(args.root_folder, &toml).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    let db = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("Database: {}", db_path.display());

    let catalog = load_catalog(config.catalog.as_ref()).await;
    if catalog.is_empty() {
        warn!("Catalog is empty; every draw will come back empty");
    }

    let state = Arc::new(SharedState::new());
    let engine = SetEngine::new(catalog, config.engine.clone(), state.clone())
        .with_database(db)
        .await;
    let engine = Arc::new(engine);

    let app = build_router(AppContext::new(state, engine));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    info!("Listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

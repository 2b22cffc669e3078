//! setlist-ui - Setlist service entry point
//!
//! Resolves the root folder, opens (or creates) the setlist database and
//! serves the JSON API.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use setlist_common::config::{self, TomlConfig, DEFAULT_PORT};
use setlist_common::db::init_database;
use setlist_common::selector::DEFAULT_TRIALS;
use setlist_common::Library;
use setlist_ui::{build_router, AppState};

/// Command-line arguments for setlist-ui
#[derive(Parser, Debug)]
#[command(name = "setlist-ui")]
#[command(about = "Setlist builder service")]
#[command(version)]
struct Args {
    /// Port to listen on (falls back to the config file, then 5740)
    #[arg(short, long, env = "SETLIST_PORT")]
    port: Option<u16>,

    /// Root folder holding the setlist database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Alternate config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "setlist_ui=info,setlist_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Starting setlist-ui v{}", env!("CARGO_PKG_VERSION"));

    let toml = match &args.config {
        Some(path) => TomlConfig::load(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => TomlConfig::load_default(),
    };

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml);
    info!("Root folder: {}", root_folder.display());
    let db_path = config::prepare_root_folder(&root_folder)?;

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let trials = toml.selector_trials.unwrap_or(DEFAULT_TRIALS);
    let state = AppState::new(Library::with_trials(pool, trials));
    let app = build_router(state);

    let port = args.port.or(toml.port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("setlist-ui listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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

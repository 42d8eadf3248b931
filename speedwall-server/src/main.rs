//! Speedwall server - Main entry point
//!
//! Receives radar telemetry and infraction captures from the roadside
//! sensor bridge, persists captures, and streams rotating wall frames
//! and live plot data to connected viewers over SSE.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use speedwall_common::db::init::init_database;
use speedwall_common::events::EventBus;
use speedwall_common::settings::{
    self, DEFAULT_DISPLAY_DURATION, DEFAULT_PORT, DEFAULT_TELEMETRY_INTERVAL, EVENT_BUS_CAPACITY,
};

use speedwall_server::api;
use speedwall_server::assets::FsAssetStore;
use speedwall_server::state::AppState;

/// Command-line arguments for speedwall-server
#[derive(Parser, Debug)]
#[command(name = "speedwall-server")]
#[command(about = "Roadside speed enforcement display wall")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "SPEEDWALL_PORT")]
    port: u16,

    /// Data directory for the database and stored photos
    #[arg(short, long)]
    data_dir: Option<String>,

    /// How long each infraction stays on the wall, in milliseconds
    #[arg(long, default_value_t = DEFAULT_DISPLAY_DURATION.as_millis() as u64)]
    display_ms: u64,

    /// Minimum interval between forwarded telemetry samples, in milliseconds
    #[arg(long, default_value_t = DEFAULT_TELEMETRY_INTERVAL.as_millis() as u64)]
    telemetry_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "speedwall=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let data_dir = settings::resolve_data_dir(args.data_dir.as_deref());
    info!("Starting Speedwall server on port {}", args.port);
    info!("Data directory: {}", data_dir.display());

    let pool = init_database(&settings::db_path(&data_dir))
        .await
        .context("Failed to initialize database")?;

    let asset_dir = settings::asset_dir(&data_dir);
    let assets = Arc::new(
        FsAssetStore::new(asset_dir.clone()).context("Failed to initialize photo storage")?,
    );

    let state = AppState::new(
        pool,
        assets,
        EventBus::new(EVENT_BUS_CAPACITY),
        Duration::from_millis(args.display_ms),
        Duration::from_millis(args.telemetry_ms),
    );

    let app = api::create_router(state, asset_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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

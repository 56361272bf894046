//! Main Entrypoint for the Twinspeak Gateway
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and command line.
//! 2. Initializing logging.
//! 3. Constructing the shared session registry and the Axum router.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use clap::Parser;
use std::{net::SocketAddr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use twinspeak_api::{config::Config, router::create_router, state::AppState};

/// Twinspeak - Real-time conversational AI over WebSocket connections.
#[derive(Parser, Debug)]
#[command(name = "twinspeak", version, about)]
struct Cli {
    /// Address to listen on. Overrides `BIND_ADDRESS`.
    #[arg(long)]
    addr: Option<SocketAddr>,
}

/// Listens for the `Ctrl+C` signal and cancels every live connection.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(addr) = cli.addr {
        config = config.with_bind_address(addr);
    }

    // --- 2. Build State ---
    let app_state = Arc::new(AppState::new(config));
    let config = app_state.config.clone();
    let shutdown = app_state.shutdown.clone();

    // --- 3. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!(log_level = %config.log_level, "Configuration loaded.");

    let app = create_router(app_state);

    // --- 4. Start Server ---
    info!(bind_address = %config.bind_address, "Gateway configured. Starting server...");
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await?;

    info!("Server has shut down.");
    Ok(())
}

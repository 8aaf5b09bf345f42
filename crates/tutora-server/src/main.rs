//! # tutora-server
//!
//! HTTP backend for the Tutora tutoring marketplace.
//!
//! This binary provides:
//! - **REST API** (axum) for accounts, the teacher directory, weekly
//!   availability, bookings, reviews and admin statistics
//! - **Booking notifications** dispatched in the background after a
//!   booking is created
//! - **Video-room presence** for confirmed bookings
//! - **Per-IP rate limiting** to protect against abuse

mod api;
mod auth;
mod config;
mod error;
mod notify;
mod rate_limit;
mod rooms;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use tutora_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::notify::{LogMailer, Notifier};
use crate::rooms::InMemoryRooms;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tutora_server=debug,tutora_store=info")),
        )
        .init();

    info!("Starting Tutora server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Database (creates the file and runs migrations if needed)
    let db = Database::open(&config.database_path)?;

    // Notifications go to the log until a mail transport is configured
    let notifier = Notifier::new(Arc::new(LogMailer), config.mail_from.clone());

    let http_addr = config.http_addr;
    let app_state = AppState::new(db, config, notifier, Arc::new(InMemoryRooms::new()));

    api::bootstrap_admin(&app_state)
        .await
        .map_err(|e| anyhow::anyhow!("admin bootstrap failed: {e}"))?;

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Evict expired rate-limit windows once per window length
    let rl = app_state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(rl.period());
        loop {
            interval.tick().await;
            rl.purge_stale().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

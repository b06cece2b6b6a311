//! Pollify: create polls, vote once per poll, share the results.
//!
//! # Layout
//!
//! - `poll` holds the rules: vote submission, tally, poll ownership.
//! - `store` dispatches persistence to PostgreSQL (`db`) or the in-process
//!   store (`memory`) picked at startup from `DATABASE_URL`.
//! - `identity` resolves the caller from the session the identity provider
//!   issued; Pollify never creates sessions itself.
//! - `handlers` and `routes` expose the JSON API under `/api`.
//!
//! # Running
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/pollify RUST_LOG=pollify=debug cargo run
//! ```
//!
//! Without `DATABASE_URL` the server keeps everything in memory.
use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod memory;
pub mod models;
pub mod poll;
pub mod routes;
pub mod state;
pub mod store;

use config::Config;
use error::StartupError;
use state::AppState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pollify=info,tower_http=info"));

    fmt().with_env_filter(filter).init();
}

pub async fn start_server() -> Result<(), StartupError> {
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::from_config(config).await?;
    let address = SocketAddr::from(([0, 0, 0, 0], state.config.port));

    let app = routes::create_routes(state);

    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    info!("Server running on {address}");
    axum_server::bind(address)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

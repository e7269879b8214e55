//! HTTP server initialization and runtime setup.
//!
//! Wires the pipeline collaborators, spawns the rate-limit sweeper, and runs
//! the Axum server until a shutdown signal arrives.

use crate::config::Config;
use crate::dispatcher::app_router;
use crate::pipeline::rate_limit::run_sweeper;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use std::net::SocketAddr;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Credential verifier, rate-limit store, and upload directory
/// - Background sweeper evicting expired rate-limit buckets
/// - Axum HTTP server with trailing-slash normalization
///
/// # Errors
///
/// Returns an error if:
/// - The upload directory cannot be created
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;
    tracing::info!(
        root = %state.upload_ingest.root().display(),
        "Upload storage ready"
    );

    let sweeper = tokio::spawn(run_sweeper(
        state.rate_limiter.clone(),
        config.rate_limit_sweep_interval(),
    ));
    tracing::info!("Rate limit sweeper started");

    let app = NormalizePathLayer::trim_trailing_slash().layer(app_router(&state));

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

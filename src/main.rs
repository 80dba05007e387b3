//! pfinance - Portfolio tracker server
//!
//! Keeps market prices fresh through the background worker and serves
//! returns computed from them over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pfinance::api::{create_router, AppState};
use pfinance::portfolio::{
    AssetRepository, InMemoryAssetRepository, PriceSource, StaticPriceSource,
};
use pfinance::worker::logging;
use pfinance::{spawn_schedule_task, spawn_sweep_task, Config};

/// Main entry point for the pfinance server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Load assets and the price table
/// 4. Start the worker, the result cache sweep and the periodic schedules
/// 5. Serve HTTP until SIGINT/SIGTERM
/// 6. Drain the worker queue, then stop background loops
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pfinance=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pfinance server");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        queue_capacity = config.queue_capacity,
        result_ttl_secs = config.result_ttl,
        sweep_interval_secs = config.sweep_interval,
        "Configuration loaded"
    );

    let assets: Arc<dyn AssetRepository> = match &config.assets_file {
        Some(path) => Arc::new(
            InMemoryAssetRepository::from_json_file(path)
                .await
                .with_context(|| format!("loading assets from {}", path.display()))?,
        ),
        None => Arc::new(InMemoryAssetRepository::new()),
    };
    let prices: Arc<dyn PriceSource> = match &config.prices_file {
        Some(path) => Arc::new(
            StaticPriceSource::from_json_file(path)
                .await
                .with_context(|| format!("loading prices from {}", path.display()))?,
        ),
        None => Arc::new(StaticPriceSource::new()),
    };

    let state = AppState::from_config(&config, assets, prices);
    state.worker.use_middleware(logging()).await;

    let mut background: Vec<JoinHandle<()>> = Vec::new();
    let worker_handle = state.worker.spawn("main");
    background.push(spawn_sweep_task(
        state.worker.results().clone(),
        config.sweep_interval(),
    ));
    for scheduled in state.catalog.scheduled() {
        background.push(spawn_schedule_task(
            Arc::clone(&state.worker),
            scheduled.task,
            scheduled.every,
        ));
    }
    info!(tasks = ?state.catalog.names(), "Background tasks started");

    let worker = Arc::clone(&state.worker);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    // Schedules stop first so nothing new is queued while draining.
    for handle in &background {
        handle.abort();
    }
    if let Err(err) = worker.shutdown(config.shutdown_timeout()).await {
        error!(error = %err, "Worker did not drain before the deadline");
    }
    worker_handle.abort();
    warn!("Background tasks aborted");

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

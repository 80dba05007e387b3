//! API Handlers
//!
//! HTTP request handlers for each endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::models::{
    EnqueueResponse, HealthResponse, ReturnsResponse, StatsResponse, TaskResultResponse,
};
use crate::portfolio::{
    Asset, AssetRepository, HistoricReturns, InMemoryReturnHistory, MonthlyReturn, PriceData,
    PriceSource, ReturnsCalculator, TaskCatalog,
};
use crate::worker::{BackgroundWorker, ResultCache};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Background worker publishing task results
    pub worker: Arc<BackgroundWorker<PriceData>>,
    /// Returns computed from cached prices
    pub calculator: ReturnsCalculator,
    /// Daily per-asset return snapshots
    pub history: HistoricReturns,
    /// Portfolio assets
    pub assets: Arc<dyn AssetRepository>,
    /// Tasks that can be triggered by name
    pub catalog: Arc<TaskCatalog>,
}

impl AppState {
    /// Wires the worker, result cache, calculator, return history and task
    /// catalogue together.
    pub fn from_config(
        config: &Config,
        assets: Arc<dyn AssetRepository>,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        let results = ResultCache::new();
        let worker = Arc::new(BackgroundWorker::new(
            results.clone(),
            config.queue_capacity,
            config.result_ttl(),
        ));
        let calculator = ReturnsCalculator::new(Arc::clone(&assets), results);
        let history = HistoricReturns::new(
            Arc::clone(&assets),
            Arc::new(InMemoryReturnHistory::new()),
            Arc::clone(&prices),
            config.gold_currency.clone(),
        );
        let catalog = TaskCatalog::new(
            Arc::clone(&assets),
            prices,
            history.clone(),
            &config.catalog_settings(),
        );

        Self {
            worker,
            calculator,
            history,
            assets,
            catalog: Arc::new(catalog),
        }
    }
}

/// Handler for GET /returns
///
/// Computes every asset class concurrently. Any failed class turns the
/// status into 500 while the classes that succeeded are still returned.
pub async fn returns_handler(State(state): State<AppState>) -> (StatusCode, Json<ReturnsResponse>) {
    let breakdown = state.calculator.returns_breakdown().await;

    let status = if breakdown.is_complete() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(breakdown.into()))
}

/// Handler for GET /returns/monthly
///
/// First and last recorded return per asset per month, newest month first.
pub async fn monthly_returns_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<MonthlyReturn>>> {
    let monthly = state
        .history
        .monthly_returns()
        .await
        .map_err(|err| EngineError::Internal(err.to_string()))?;

    Ok(Json(monthly))
}

/// Handler for GET /tasks/:name
///
/// Returns the latest stored result of the named task.
pub async fn task_result_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TaskResultResponse>> {
    let result = state
        .worker
        .get_result(&name)
        .await
        .ok_or_else(|| EngineError::NotFound(format!("no result for task {}", name)))?;

    Ok(Json(TaskResultResponse::new(name, result)))
}

/// Handler for POST /tasks/:name
///
/// Submits a catalogued task for immediate execution. Waits if the worker
/// queue is full.
pub async fn enqueue_task_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<EnqueueResponse>)> {
    let scheduled = state
        .catalog
        .get(&name)
        .ok_or_else(|| EngineError::NotFound(format!("unknown task {}", name)))?;

    state.worker.enqueue(scheduled.task.clone()).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse::new(name, state.worker.len())),
    ))
}

/// Handler for GET /assets
pub async fn list_assets_handler(State(state): State<AppState>) -> Result<Json<Vec<Asset>>> {
    let assets = state
        .assets
        .all_assets()
        .await
        .map_err(|err| EngineError::Internal(err.to_string()))?;

    Ok(Json(assets))
}

/// Handler for GET /assets/:id
pub async fn get_asset_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Asset>> {
    let asset = state
        .assets
        .asset_by_id(id)
        .await
        .map_err(|err| EngineError::Internal(err.to_string()))?
        .ok_or_else(|| EngineError::NotFound(format!("asset {}", id)))?;

    Ok(Json(asset))
}

/// Handler for POST /assets
pub async fn create_asset_handler(
    State(state): State<AppState>,
    Json(asset): Json<Asset>,
) -> Result<(StatusCode, Json<Asset>)> {
    let stored = state
        .assets
        .insert(asset)
        .await
        .map_err(|err| EngineError::Internal(err.to_string()))?;

    Ok((StatusCode::CREATED, Json(stored)))
}

/// Handler for GET /stats
///
/// Returns result cache statistics and the worker backlog.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.worker.results().stats().await;
    Json(StatsResponse::new(cache, state.worker.len()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

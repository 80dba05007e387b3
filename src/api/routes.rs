//! API Routes
//!
//! Configures the Axum router with all portfolio endpoints.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    create_asset_handler, enqueue_task_handler, get_asset_handler, health_handler,
    list_assets_handler, monthly_returns_handler, returns_handler, stats_handler,
    task_result_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /returns` - Returns breakdown by asset class
/// - `GET /returns/monthly` - First and last daily return per asset per month
/// - `GET /tasks/:name` - Latest stored result of a task
/// - `POST /tasks/:name` - Run a catalogued task now
/// - `GET /assets` - List portfolio assets
/// - `POST /assets` - Add a portfolio asset
/// - `GET /assets/:id` - One portfolio asset
/// - `GET /stats` - Result cache statistics and worker backlog
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/returns", get(returns_handler))
        .route("/returns/monthly", get(monthly_returns_handler))
        .route(
            "/tasks/:name",
            get(task_result_handler).post(enqueue_task_handler),
        )
        .route("/assets", get(list_assets_handler).post(create_asset_handler))
        .route("/assets/:id", get(get_asset_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

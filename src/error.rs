//! Error types for the task engine and its HTTP surface
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Engine Error Enum ==
/// Unified error type for the engine and the API built on it.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Shutdown deadline passed while tasks were still queued or running
    #[error("timeout waiting for worker queue: {pending} task(s) still pending")]
    ShutdownTimeout { pending: usize },

    /// The worker queue no longer accepts tasks
    #[error("worker queue is closed")]
    QueueClosed,

    /// `run` was called on a worker whose consumer loop already started
    #[error("worker already running, refusing to start {0}")]
    AlreadyRunning(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::ShutdownTimeout { .. } | EngineError::QueueClosed => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            EngineError::AlreadyRunning(_) | EngineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

//! Response DTOs for the API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::aggregate::{Aggregate, BranchError};
use crate::cache::CacheStats;
use crate::portfolio::PriceData;
use crate::worker::TaskResult;

/// Response body for the returns breakdown (GET /returns)
///
/// Each asset class has its own section; failed classes are listed in
/// `errors` and missing from `returns`.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnsResponse {
    /// P&L by asset class, then by ticker or asset name
    pub returns: BTreeMap<String, HashMap<String, f32>>,
    /// One entry per failed asset class
    pub errors: Vec<BranchError>,
}

impl From<Aggregate<String, f32>> for ReturnsResponse {
    fn from(aggregate: Aggregate<String, f32>) -> Self {
        Self {
            returns: aggregate.data,
            errors: aggregate.errors,
        }
    }
}

/// Response body for a stored task result (GET /tasks/:name)
#[derive(Debug, Clone, Serialize)]
pub struct TaskResultResponse {
    pub name: String,
    /// "succeeded" or "failed"
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<PriceData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Completion time in ISO 8601 format
    pub completed_at: String,
}

impl TaskResultResponse {
    pub fn new(name: impl Into<String>, result: TaskResult<PriceData>) -> Self {
        let completed_at = result.completed_at.to_rfc3339();
        let (status, value, error) = match result.outcome {
            Ok(value) => ("succeeded", Some(value), None),
            Err(err) => ("failed", None, Some(err.to_string())),
        };
        Self {
            name: name.into(),
            status,
            value,
            error,
            completed_at,
        }
    }
}

/// Response body for a task submission (POST /tasks/:name)
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueResponse {
    pub message: String,
    pub name: String,
    /// Tasks queued or running right after this one was accepted
    pub pending: usize,
}

impl EnqueueResponse {
    pub fn new(name: impl Into<String>, pending: usize) -> Self {
        let name = name.into();
        Self {
            message: format!("Task '{}' enqueued", name),
            name,
            pending,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Tasks queued or running in the worker
    pub pending_tasks: usize,
}

impl StatsResponse {
    pub fn new(cache: CacheStats, pending_tasks: usize) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            cache,
            pending_tasks,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

//! Task, job and result types consumed by the background worker.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

// == Job Error ==
/// Failure reported by a job. Clonable so it can live inside cached results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("{0}")]
    Failed(String),

    #[error("job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    pub fn failed(message: impl fmt::Display) -> Self {
        JobError::Failed(message.to_string())
    }

    /// Builds a `Panicked` error from the payload of a caught panic.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_string()
        };
        JobError::Panicked(message)
    }
}

// == Job Context ==
/// Context handed to a job when it runs.
///
/// Carries the cancellation token supplied at enqueue time. The worker never
/// checks it; a job that wants to stop early polls [`is_cancelled`](Self::is_cancelled)
/// or races its work against [`cancelled`](Self::cancelled).
#[derive(Debug, Clone)]
pub struct JobContext {
    task_name: String,
    cancel: CancellationToken,
}

impl JobContext {
    pub fn new(task_name: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            task_name: task_name.into(),
            cancel,
        }
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the task's origin token is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

// == Job ==
pub type JobFuture<T> = BoxFuture<'static, Result<T, JobError>>;

/// A reusable unit of background work producing a `T`.
///
/// Jobs are reference counted so the same task can be enqueued repeatedly by
/// a periodic scheduler.
pub struct Job<T> {
    run: Arc<dyn Fn(JobContext) -> JobFuture<T> + Send + Sync>,
}

impl<T> Clone for Job<T> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<T> fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Job")
    }
}

impl<T: Send + 'static> Job<T> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, JobError>> + Send + 'static,
    {
        Self {
            run: Arc::new(move |ctx| Box::pin(f(ctx))),
        }
    }

    pub fn call(&self, ctx: JobContext) -> JobFuture<T> {
        (self.run)(ctx)
    }
}

// == Task ==
/// A named job waiting in the worker queue.
///
/// `name` is also the cache key the result is published under, so two tasks
/// with the same name overwrite each other's result.
#[derive(Debug, Clone)]
pub struct Task<T> {
    pub name: String,
    pub job: Job<T>,
    /// Cancellation scope the job observes; never the worker's own lifetime.
    pub origin: CancellationToken,
    /// How long the result stays readable. Zero means the worker default.
    pub ttl: Duration,
}

impl<T> Task<T> {
    pub fn new(name: impl Into<String>, job: Job<T>) -> Self {
        Self {
            name: name.into(),
            job,
            origin: CancellationToken::new(),
            ttl: Duration::ZERO,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_origin(mut self, origin: CancellationToken) -> Self {
        self.origin = origin;
        self
    }
}

// == Task Result ==
/// Outcome of one job run as stored in the result cache.
#[derive(Debug, Clone)]
pub struct TaskResult<T> {
    pub outcome: Result<T, JobError>,
    pub completed_at: DateTime<Utc>,
}

impl<T> TaskResult<T> {
    pub fn new(outcome: Result<T, JobError>) -> Self {
        Self {
            outcome,
            completed_at: Utc::now(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&JobError> {
        self.outcome.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

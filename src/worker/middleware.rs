//! Job middleware: wrappers applied around every job the worker dispatches.

use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::worker::{Job, JobContext};

/// Wraps a job in another job, adding behavior around its execution.
///
/// The worker holds exactly one middleware at a time. Several wrappers are
/// combined explicitly with [`Middleware::chain`] before being installed.
pub struct Middleware<T> {
    wrap: Arc<dyn Fn(Job<T>) -> Job<T> + Send + Sync>,
}

impl<T> Clone for Middleware<T> {
    fn clone(&self) -> Self {
        Self {
            wrap: Arc::clone(&self.wrap),
        }
    }
}

impl<T> fmt::Debug for Middleware<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}

impl<T: Send + 'static> Middleware<T> {
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(Job<T>) -> Job<T> + Send + Sync + 'static,
    {
        Self {
            wrap: Arc::new(wrap),
        }
    }

    /// Middleware that returns the job untouched.
    pub fn identity() -> Self {
        Self::new(|job| job)
    }

    pub fn wrap(&self, job: Job<T>) -> Job<T> {
        (self.wrap)(job)
    }

    /// Combines `layers` into one middleware. The first layer is outermost:
    /// it sees the job start first and finish last.
    pub fn chain(layers: impl IntoIterator<Item = Middleware<T>>) -> Self {
        let layers: Vec<Middleware<T>> = layers.into_iter().collect();
        Self::new(move |job| layers.iter().rev().fold(job, |inner, layer| layer.wrap(inner)))
    }
}

impl<T: Send + 'static> Default for Middleware<T> {
    fn default() -> Self {
        Self::identity()
    }
}

/// Logs start, duration and outcome of every job.
pub fn logging<T: Send + 'static>() -> Middleware<T> {
    Middleware::new(|job: Job<T>| {
        Job::new(move |ctx: JobContext| {
            let job = job.clone();
            async move {
                let task = ctx.task_name().to_string();
                let started = Instant::now();
                info!(task = %task, "Job started");

                let outcome = job.call(ctx).await;
                let elapsed_ms = started.elapsed().as_millis() as u64;
                match &outcome {
                    Ok(_) => info!(task = %task, elapsed_ms, "Job succeeded"),
                    Err(err) => warn!(task = %task, elapsed_ms, error = %err, "Job failed"),
                }
                outcome
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    fn recording(label: &'static str, log: Arc<Mutex<Vec<String>>>) -> Middleware<u32> {
        Middleware::new(move |job: Job<u32>| {
            let log = Arc::clone(&log);
            Job::new(move |ctx| {
                let job = job.clone();
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(format!("{} enter", label));
                    let out = job.call(ctx).await;
                    log.lock().unwrap().push(format!("{} exit", label));
                    out
                }
            })
        })
    }

    fn ctx() -> JobContext {
        JobContext::new("t", CancellationToken::new())
    }

    #[tokio::test]
    async fn test_identity_passes_through() {
        let job = Middleware::identity().wrap(Job::new(|_| async { Ok(9u32) }));
        assert_eq!(job.call(ctx()).await, Ok(9));
    }

    #[tokio::test]
    async fn test_chain_applies_first_layer_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chained = Middleware::chain([
            recording("outer", Arc::clone(&log)),
            recording("inner", Arc::clone(&log)),
        ]);

        let job = chained.wrap(Job::new(|_| async { Ok(1u32) }));
        assert_eq!(job.call(ctx()).await, Ok(1));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer enter", "inner enter", "inner exit", "outer exit"]
        );
    }

    #[tokio::test]
    async fn test_middleware_can_rewrite_outcome() {
        let double = Middleware::new(|job: Job<u32>| {
            Job::new(move |ctx| {
                let job = job.clone();
                async move { job.call(ctx).await.map(|v| v * 2) }
            })
        });

        let job = double.wrap(Job::new(|_| async { Ok(21u32) }));
        assert_eq!(job.call(ctx()).await, Ok(42));
    }

    #[tokio::test]
    async fn test_logging_preserves_outcome() {
        let job = logging().wrap(Job::new(|_| async {
            Err::<u32, _>(crate::worker::JobError::failed("upstream down"))
        }));

        let outcome = job.call(ctx()).await;
        assert_eq!(outcome.unwrap_err().to_string(), "upstream down");
    }
}

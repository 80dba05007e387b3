//! Periodic Task Scheduler
//!
//! Background task that submits the same task to the worker on a fixed period.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::worker::{BackgroundWorker, Task};

/// Spawns a loop that enqueues `task` every `every`, starting immediately.
///
/// Enqueueing waits while the worker queue is full, so a slow worker delays
/// the next tick instead of piling up submissions. The loop stops if the queue
/// is closed.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
pub fn spawn_schedule_task<T>(
    worker: Arc<BackgroundWorker<T>>,
    task: Task<T>,
    every: Duration,
) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            task = %task.name,
            every_secs = every.as_secs(),
            "Starting periodic schedule"
        );

        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(err) = worker.enqueue(task.clone()).await {
                error!(task = %task.name, error = %err, "Stopping schedule");
                return;
            }
        }
    })
}

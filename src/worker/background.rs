//! Background Worker
//!
//! A single consumer draining a bounded FIFO queue of [`Task`]s. Each job runs
//! to completion before the next one starts, and its outcome is published in
//! the shared result cache under the task name.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{EngineError, Result};
use crate::worker::{JobContext, JobError, Middleware, ResultCache, Task, TaskResult};

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// How long a result stays readable when its task does not set a TTL.
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(10 * 60);

// == Background Worker ==
/// Runs tasks one at a time, in submission order.
///
/// The pending count covers tasks sitting in the queue plus the one currently
/// executing. It is raised in the same synchronous step that hands a task to
/// the queue and lowered only after the task's result has been written, so it
/// never disagrees with the queue. Callers still waiting for a free slot in
/// [`enqueue`](Self::enqueue) are not counted.
pub struct BackgroundWorker<T> {
    sender: mpsc::Sender<Task<T>>,
    receiver: Mutex<Option<mpsc::Receiver<Task<T>>>>,
    pending: watch::Sender<usize>,
    middleware: RwLock<Middleware<T>>,
    results: ResultCache<T>,
    default_ttl: Duration,
}

impl<T> BackgroundWorker<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a worker publishing into `results`.
    ///
    /// # Arguments
    /// * `results` - Cache shared with the consumers of task results
    /// * `capacity` - Maximum number of queued tasks before `enqueue` waits
    /// * `default_ttl` - Result lifetime for tasks with a zero TTL
    pub fn new(results: ResultCache<T>, capacity: usize, default_ttl: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (pending, _) = watch::channel(0);

        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            pending,
            middleware: RwLock::new(Middleware::identity()),
            results,
            default_ttl,
        }
    }

    // == Enqueue ==
    /// Queues `task` behind every task already submitted.
    ///
    /// Waits while the queue is full. Fails only if the queue has been closed,
    /// which happens when the worker itself is dropped.
    pub async fn enqueue(&self, task: Task<T>) -> Result<()> {
        let permit = self
            .sender
            .reserve()
            .await
            .map_err(|_| EngineError::QueueClosed)?;

        info!(task = %task.name, "New task enqueued");
        self.pending.send_modify(|pending| *pending += 1);
        permit.send(task);
        Ok(())
    }

    // == Run ==
    /// Consumer loop. Must be started exactly once, on its own task.
    ///
    /// Returns only if the queue is closed; a second call fails with
    /// [`EngineError::AlreadyRunning`].
    pub async fn run(&self, worker_id: &str) -> Result<()> {
        let mut receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| EngineError::AlreadyRunning(worker_id.to_string()))?;

        info!(worker = worker_id, "Worker started, listening for tasks");

        while let Some(task) = receiver.recv().await {
            self.process(worker_id, task).await;
        }

        warn!(worker = worker_id, "Task queue closed, worker exiting");
        Ok(())
    }

    /// Spawns [`run`](Self::run) on a dedicated tokio task.
    pub fn spawn(self: &Arc<Self>, worker_id: impl Into<String>) -> JoinHandle<Result<()>> {
        let worker = Arc::clone(self);
        let worker_id = worker_id.into();
        tokio::spawn(async move { worker.run(&worker_id).await })
    }

    async fn process(&self, worker_id: &str, task: Task<T>) {
        info!(worker = worker_id, task = %task.name, "Running task");

        let middleware = self.middleware.read().await.clone();
        let job = task.job.clone();
        let ctx = JobContext::new(task.name.clone(), task.origin.clone());

        // Wrapping, building and polling the job all happen on a separate
        // tokio task, so a panic anywhere in them stays contained to it.
        let running = tokio::spawn(async move { middleware.wrap(job).call(ctx).await });
        let outcome = match running.await {
            Ok(outcome) => outcome,
            Err(join_error) if join_error.is_panic() => {
                Err(JobError::from_panic(join_error.into_panic()))
            }
            Err(join_error) => Err(JobError::failed(join_error)),
        };

        if let Err(err) = &outcome {
            error!(worker = worker_id, task = %task.name, error = %err, "Task failed");
        }

        let ttl = if task.ttl.is_zero() {
            self.default_ttl
        } else {
            task.ttl
        };
        self.results
            .set(task.name.clone(), TaskResult::new(outcome), ttl)
            .await;

        self.pending
            .send_modify(|pending| *pending = pending.saturating_sub(1));
        info!(worker = worker_id, task = %task.name, "Task completed");
    }

    // == Use ==
    /// Installs `middleware`, replacing the previous one.
    ///
    /// Only one middleware is active at a time; use [`Middleware::chain`] to
    /// combine several before installing them.
    pub async fn use_middleware(&self, middleware: Middleware<T>) {
        *self.middleware.write().await = middleware;
    }

    // == Length ==
    /// Tasks queued or executing.
    ///
    /// Producers still blocked in [`enqueue`](Self::enqueue) waiting for a
    /// free slot are not included: a task is counted only once it holds a
    /// queue slot. Use this for drain decisions, not as a measure of demand.
    pub fn len(&self) -> usize {
        *self.pending.borrow()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Get Result ==
    /// Latest stored result for `task_name`, if it has not expired.
    pub async fn get_result(&self, task_name: &str) -> Option<TaskResult<T>> {
        self.results.get(task_name).await
    }

    pub fn results(&self) -> &ResultCache<T> {
        &self.results
    }

    // == Shutdown ==
    /// Waits for every pending task to finish, for at most `timeout`.
    ///
    /// Nothing is cancelled: queued tasks and the one in flight keep running
    /// whether or not the wait succeeds.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.shutdown_with(tokio::time::sleep(timeout)).await
    }

    /// Waits for every pending task to finish, giving up as soon as
    /// `deadline` completes.
    ///
    /// Any future works as the deadline, e.g. `token.cancelled()` to stop
    /// waiting when a [`CancellationToken`](tokio_util::sync::CancellationToken)
    /// fires. Giving up returns [`EngineError::ShutdownTimeout`].
    pub async fn shutdown_with<F>(&self, deadline: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if self.is_empty() {
            return Ok(());
        }

        info!(pending = self.len(), "Waiting for worker queue to drain");

        let mut pending = self.pending.subscribe();
        tokio::select! {
            biased;

            drained = pending.wait_for(|count| *count == 0) => {
                drained.map(|_| ()).map_err(|_| EngineError::QueueClosed)
            }
            _ = deadline => {
                let pending = self.len();
                warn!(pending, "Gave up waiting for worker queue");
                Err(EngineError::ShutdownTimeout { pending })
            }
        }
    }
}

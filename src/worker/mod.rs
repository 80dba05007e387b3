//! Worker Module
//!
//! Single-consumer background task queue. Producers enqueue named tasks; the
//! worker runs them in order and publishes each outcome in a [`ResultCache`]
//! under the task name.

mod background;
mod middleware;
mod task;

use crate::cache::TtlCache;

pub use background::{BackgroundWorker, DEFAULT_QUEUE_CAPACITY, DEFAULT_RESULT_TTL};
pub use middleware::{logging, Middleware};
pub use task::{Job, JobContext, JobError, JobFuture, Task, TaskResult};

/// Cache of task outcomes keyed by task name.
pub type ResultCache<T> = TtlCache<String, TaskResult<T>>;

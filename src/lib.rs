//! pfinance - Portfolio tracker built on a small background task engine
//!
//! The engine pieces are a TTL cache, a single-consumer task worker with
//! graceful shutdown and a fan-out/fan-in aggregator. The portfolio module
//! uses them to keep market prices fresh and compute returns.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod portfolio;
pub mod tasks;
pub mod worker;

pub use aggregate::{Aggregate, BranchError, FanOut};
pub use api::AppState;
pub use cache::TtlCache;
pub use config::Config;
pub use error::{EngineError, Result};
pub use tasks::{spawn_schedule_task, spawn_sweep_task};
pub use worker::{BackgroundWorker, Job, JobContext, JobError, Middleware, Task, TaskResult};

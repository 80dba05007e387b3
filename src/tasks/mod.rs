//! Background Tasks Module
//!
//! Long-running loops started at boot and aborted at shutdown.
//!
//! # Tasks
//! - TTL Sweep: Removes expired cache entries at configured intervals
//! - Scheduler: Submits periodic tasks to the background worker

mod scheduler;
mod sweep;

pub use scheduler::spawn_schedule_task;
pub use sweep::spawn_sweep_task;

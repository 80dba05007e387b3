//! Cache Module
//!
//! Generic in-memory caching with per-entry TTL, lazy eviction on read and an
//! active background sweep (see [`crate::tasks::spawn_sweep_task`]).

mod entry;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use shared::TtlCache;
pub use stats::CacheStats;
pub use store::CacheStore;

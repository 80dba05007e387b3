//! TTL Sweep Task
//!
//! Background task that periodically removes expired cache entries, so keys
//! that are written once and never read again do not accumulate.

use std::hash::Hash;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TtlCache;

/// Spawns a background task that purges expired entries every `interval`.
///
/// The sweep wakes on its own schedule regardless of cache traffic and holds
/// the cache lock for the duration of one pass.
///
/// # Returns
/// A JoinHandle for the spawned task, which is aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache: TtlCache<String, u32> = TtlCache::new();
/// let sweep_handle = spawn_sweep_task(cache.clone(), Duration::from_secs(5));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<K, V>(cache: TtlCache<K, V>, interval: Duration) -> JoinHandle<()>
where
    K: Eq + Hash + Send + 'static,
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "Starting TTL sweep task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired().await;

            if removed > 0 {
                info!("TTL sweep: removed {} expired entries", removed);
            } else {
                debug!("TTL sweep: no expired entries found");
            }
        }
    })
}

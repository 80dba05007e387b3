//! Shared Cache Handle
//!
//! Cloneable, thread-safe handle over a [`CacheStore`]. Every operation, the
//! background sweep included, goes through the same mutex.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::cache::{CacheStats, CacheStore};

/// Thread-safe TTL cache shared between producers and consumers.
///
/// Cloning the handle is cheap and every clone sees the same entries.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    inner: Arc<Mutex<CacheStore<K, V>>>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheStore::new())),
        }
    }

    /// Inserts or overwrites `key`; the entry expires `ttl` from now.
    pub async fn set(&self, key: K, value: V, ttl: Duration) {
        self.inner.lock().await.set(key, value, ttl);
    }

    /// Returns the live value for `key`, evicting it if it has expired.
    pub async fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().await.get(key)
    }

    /// Removes `key` and returns its value if it had not yet expired.
    pub async fn pop<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().await.pop(key)
    }

    pub async fn remove<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().await.remove(key);
    }

    /// Drops every expired entry under a single lock hold.
    pub async fn purge_expired(&self) -> usize {
        self.inner.lock().await.purge_expired()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.lock().await.stats()
    }
}

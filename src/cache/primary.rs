//! Primary Cache Module
//!
//! Thread-safe in-process tier: an [`EntryStore`] behind one mutex.

use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheStats, EntryStore};

// == Primary Cache ==
/// Bounded LRU cache with absolute per-entry TTL, shared across request tasks.
///
/// Every operation runs in a single critical section over the whole store, so
/// a `get` racing a `put` or an eviction for the same key sees either the old
/// or the new entry, never a mix. The lock is never held across an `.await`.
#[derive(Debug)]
pub struct PrimaryCache {
    store: Mutex<EntryStore>,
    default_ttl: Duration,
}

impl PrimaryCache {
    /// Creates a cache holding at most `capacity` entries, each living for
    /// `default_ttl` unless put with an explicit TTL.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            store: Mutex::new(EntryStore::new(capacity)),
            default_ttl,
        }
    }

    /// Returns the value for `key` if present and unexpired.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.store.lock().get_at(key, Instant::now())
    }

    /// Stores `value` under `key` with the cache's default TTL.
    pub fn put(&self, key: impl Into<String>, value: Bytes) {
        self.put_with_ttl(key, value, self.default_ttl);
    }

    /// Stores `value` under `key`, expiring after `ttl`.
    pub fn put_with_ttl(&self, key: impl Into<String>, value: Bytes, ttl: Duration) {
        let evicted = self
            .store
            .lock()
            .put_at(key.into(), value, ttl, Instant::now());
        if let Some(evicted) = evicted {
            debug!(key = %evicted, "evicted least recently used entry");
        }
    }

    /// Drops `key` from the cache, returning whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.store.lock().remove(key)
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        self.store.lock().cleanup_expired_at(Instant::now())
    }

    /// Whether `key` holds an unexpired entry. Does not affect recency or stats.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.store
            .lock()
            .peek(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.store.lock().capacity()
    }

    /// Runs `f` with exclusive access to the underlying store.
    #[cfg(test)]
    pub(crate) fn with_store<R>(&self, f: impl FnOnce(&mut EntryStore) -> R) -> R {
        f(&mut self.store.lock())
    }
}

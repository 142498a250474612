//! Entry Store Module
//!
//! Fixed-capacity map from key to entry, paired with an O(1) recency list.
//! Not synchronized on its own; [`PrimaryCache`](crate::cache::PrimaryCache)
//! wraps it in a single mutex.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::trace;

use crate::cache::lru::Handle;
use crate::cache::stats::{StatCounters, StatEvent};
use crate::cache::{CacheEntry, CacheStats, LruTracker};

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    handle: Handle,
}

// == Entry Store ==
/// Bounded key/value storage with LRU eviction and absolute per-entry expiry.
///
/// The map's key set and the recency list's key set are always identical and
/// the number of entries never exceeds the capacity.
#[derive(Debug)]
pub struct EntryStore {
    /// Key-value storage
    entries: HashMap<String, Slot>,
    /// Recency order, most recently used first
    lru: LruTracker,
    counters: StatCounters,
    /// Maximum number of entries allowed
    capacity: usize,
}

impl EntryStore {
    // == Constructor ==
    /// Creates a new store holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            lru: LruTracker::with_capacity(capacity),
            counters: StatCounters::default(),
            capacity,
        }
    }

    // == Get ==
    /// Looks up `key` as of `now`.
    ///
    /// An expired entry is removed on the spot and reported as a miss. A hit
    /// moves the entry to the most recently used position.
    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<Bytes> {
        let Some(slot) = self.entries.get(key) else {
            self.counters.record(StatEvent::Miss);
            return None;
        };

        if slot.entry.is_expired_at(now) {
            let handle = slot.handle;
            self.entries.remove(key);
            self.lru.remove(handle);
            self.counters.record(StatEvent::Miss);
            self.counters.record(StatEvent::Expired(1));
            trace!(key = %key, "primary entry expired at read");
            return None;
        }

        let value = slot.entry.value.clone();
        let handle = slot.handle;
        self.lru.touch(handle);
        self.counters.record(StatEvent::Hit);
        Some(value)
    }

    // == Put ==
    /// Inserts or overwrites `key`, expiring `ttl` after `now`.
    ///
    /// Overwriting replaces the value and expiry and refreshes recency without
    /// evicting. Inserting a new key into a full store first evicts the least
    /// recently used entry, whose key is returned.
    pub fn put_at(&mut self, key: String, value: Bytes, ttl: Duration, now: Instant) -> Option<String> {
        if let Some(slot) = self.entries.get_mut(&key) {
            slot.entry = CacheEntry::new(key, value, ttl, now);
            let handle = slot.handle;
            self.lru.touch(handle);
            return None;
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.lru.evict_oldest() {
                self.entries.remove(&oldest);
                self.counters.record(StatEvent::Evicted);
                trace!(key = %oldest, "primary entry evicted");
                evicted = Some(oldest);
            }
        }

        let handle = self.lru.push_front(&key);
        let entry = CacheEntry::new(key.clone(), value, ttl, now);
        self.entries.insert(key, Slot { entry, handle });
        evicted
    }

    // == Remove ==
    /// Removes an entry by key, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(slot) => {
                self.lru.remove(slot.handle);
                true
            }
            None => false,
        }
    }

    // == Peek ==
    /// Returns the entry for `key` without touching recency or statistics.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key).map(|slot| &slot.entry)
    }

    // == Cleanup Expired ==
    /// Removes all entries expired as of `now`.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired_at(&mut self, now: Instant) -> usize {
        let expired: Vec<(String, Handle)> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired_at(now))
            .map(|(key, slot)| (key.clone(), slot.handle))
            .collect();

        for (key, handle) in &expired {
            self.entries.remove(key);
            self.lru.remove(*handle);
        }

        self.counters.record(StatEvent::Expired(expired.len()));
        expired.len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entries.len(), self.capacity)
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.lru.iter().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Panics if the map and the recency list disagree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        use std::collections::HashSet;

        let listed = self.keys_by_recency();
        let unique: HashSet<&String> = listed.iter().collect();
        assert_eq!(unique.len(), listed.len(), "duplicate key in recency list");
        assert_eq!(listed.len(), self.entries.len(), "list/map size mismatch");
        assert_eq!(self.lru.len(), self.entries.len());
        for key in &listed {
            assert!(self.entries.contains_key(key), "listed key {key} not in map");
        }
        assert!(self.entries.len() <= self.capacity, "capacity exceeded");
    }
}

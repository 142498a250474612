//! Cache Statistics Module
//!
//! Live counters owned by the entry store, and the point-in-time
//! [`CacheStats`] snapshot handed to callers.

/// Something the store counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatEvent {
    Hit,
    Miss,
    /// Entries dropped because their TTL elapsed
    Expired(usize),
    /// Least recently used entry displaced by an insert at capacity
    Evicted,
}

/// Monotonic counters, mutated under the store's lock.
#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl StatCounters {
    pub(crate) fn record(&mut self, event: StatEvent) {
        match event {
            StatEvent::Hit => self.hits += 1,
            StatEvent::Miss => self.misses += 1,
            StatEvent::Expired(count) => self.expirations += count as u64,
            StatEvent::Evicted => self.evictions += 1,
        }
    }

    pub(crate) fn snapshot(&self, total_entries: usize, capacity: usize) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expirations: self.expirations,
            total_entries,
            capacity,
        }
    }
}

// == Cache Stats ==
/// Primary cache metrics at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Lookups answered from the primary tier
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub total_entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// hits / (hits + misses), 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }
}

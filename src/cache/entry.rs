//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with absolute expiry.

use std::time::{Duration, Instant};

use bytes::Bytes;

// == Cache Entry ==
/// A cached key/value pair with its absolute expiration instant.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The key this entry is stored under
    pub key: String,
    /// The stored response body
    pub value: Bytes,
    /// When the entry was created or last overwritten
    pub inserted_at: Instant,
    /// Absolute expiration instant
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry that expires `ttl` after `now`.
    pub fn new(key: String, value: Bytes, ttl: Duration, now: Instant) -> Self {
        Self {
            key,
            value,
            inserted_at: now,
            expires_at: expires_after(now, ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now >= expires_at`, so a zero TTL produces an
    /// entry that is already expired.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining lifetime at `now`, saturating at zero.
    pub fn ttl_remaining_at(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

/// Roughly a century; used as the expiry horizon when `now + ttl` overflows.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 100);

/// Computes `now + ttl`, clamping to a far-future instant on overflow.
pub(crate) fn expires_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

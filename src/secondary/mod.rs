//! Secondary Cache Module
//!
//! The optional shared tier consulted between the primary cache and the
//! origin. Implementations absorb every failure: a broken secondary tier
//! behaves like one that never has the key.

mod redis_tier;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

pub use redis_tier::RedisTier;

/// A keyed store with native TTL, reachable over the network.
#[async_trait]
pub trait SecondaryTier: Send + Sync {
    /// Short name used in logs and stats.
    fn name(&self) -> &'static str;

    /// Looks up `key`. Errors and timeouts are reported as a miss.
    async fn get(&self, key: &str) -> Option<Bytes>;

    /// Stores `value` under `key` for `ttl`. Best effort: failures are logged
    /// and dropped.
    async fn set(&self, key: &str, value: Bytes, ttl: Duration);
}

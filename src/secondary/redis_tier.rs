//! Redis-backed secondary tier.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use deadpool_redis::{Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use super::SecondaryTier;
use crate::config::RedisSettings;
use crate::error::{ConfigError, TierError};

/// Secondary tier talking to Redis through a deadpool connection pool.
///
/// The pool is safe for concurrent use and clones share connections.
#[derive(Clone)]
pub struct RedisTier {
    pool: Pool,
    timeout: Duration,
    key_prefix: String,
}

impl RedisTier {
    /// Builds the pool. Connections are opened lazily, so an unreachable
    /// server is not an error here; only a malformed URL is.
    pub fn connect(settings: &RedisSettings) -> Result<Self, ConfigError> {
        let mut pool_config = PoolConfig::new(settings.pool_size.max(1));
        pool_config.timeouts.wait = Some(settings.timeout);
        pool_config.timeouts.create = Some(settings.timeout);
        pool_config.timeouts.recycle = Some(settings.timeout);

        let mut redis_config = deadpool_redis::Config::from_url(&settings.url);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| ConfigError::InvalidValue {
                name: "REDIS_URL",
                value: settings.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            pool,
            timeout: settings.timeout,
            key_prefix: settings.key_prefix.clone(),
        })
    }

    /// Checks connectivity with a `PING`. Used at startup for logging only.
    pub async fn ping(&self) -> bool {
        let result = self
            .bounded(async {
                let mut conn = self.pool.get().await?;
                let _: String = redis::cmd("PING").query_async(&mut conn).await?;
                Ok::<_, TierError>(())
            })
            .await;

        match result {
            Ok(()) => {
                info!("Connected to Redis secondary tier");
                true
            }
            Err(e) => {
                warn!(error = %e, "Redis unreachable, secondary tier will report misses");
                false
            }
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, TierError>
    where
        F: Future<Output = Result<T, TierError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| TierError::Timeout(self.timeout))?
    }
}

/// Redis `EX` takes whole seconds; round up and never send zero.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl SecondaryTier for RedisTier {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Option<Bytes> {
        let redis_key = self.namespaced(key);
        let result = self
            .bounded(async {
                let mut conn = self.pool.get().await?;
                let value: Option<Vec<u8>> = conn.get(&redis_key).await?;
                Ok::<_, TierError>(value)
            })
            .await;

        match result {
            Ok(Some(data)) => {
                debug!(key = %key, "cache hit (secondary)");
                Some(Bytes::from(data))
            }
            Ok(None) => {
                debug!(key = %key, "cache miss (secondary)");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Redis GET failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) {
        let redis_key = self.namespaced(key);
        let secs = ttl_seconds(ttl);
        let result = self
            .bounded(async {
                let mut conn = self.pool.get().await?;
                conn.set_ex::<_, _, ()>(&redis_key, &value[..], secs).await?;
                Ok::<_, TierError>(())
            })
            .await;

        match result {
            Ok(()) => debug!(key = %key, ttl_secs = secs, "cache set (secondary)"),
            Err(e) => warn!(key = %key, error = %e, "Redis SET failed, dropping backfill"),
        }
    }
}

//! TTL Cleanup Task
//!
//! Background task that periodically removes expired primary cache entries.
//! Without it, expired entries are dropped only when read or evicted.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::PrimaryCache;

/// Spawns a background task that sweeps expired entries from `cache`.
///
/// Returns `None` when `cleanup_interval_secs` is 0, which disables the
/// sweep. The returned handle is aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(PrimaryCache::new(1000, Duration::from_secs(10)));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 1);
/// // Later, during shutdown:
/// if let Some(handle) = cleanup_handle { handle.abort(); }
/// ```
pub fn spawn_cleanup_task(
    cache: Arc<PrimaryCache>,
    cleanup_interval_secs: u64,
) -> Option<JoinHandle<()>> {
    if cleanup_interval_secs == 0 {
        return None;
    }
    let interval = Duration::from_secs(cleanup_interval_secs);

    Some(tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup_expired();
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    }))
}

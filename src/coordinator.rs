//! Cache Coordinator
//!
//! Resolves a request through Primary, then Secondary, then Origin, and
//! backfills the tiers above whichever one answered.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

use crate::cache::{CacheStats, PrimaryCache};
use crate::error::OriginError;
use crate::models::{RequestDescriptor, Resolution, Tier};
use crate::origin::OriginResolver;
use crate::secondary::SecondaryTier;

/// Shared handle to the tiers, cloned into every request.
#[derive(Clone)]
pub struct CacheCoordinator {
    primary: Arc<PrimaryCache>,
    secondary: Option<Arc<dyn SecondaryTier>>,
    secondary_ttl: Duration,
    secondary_timeout: Duration,
    origin: Arc<OriginResolver>,
}

impl CacheCoordinator {
    /// Coordinator with no secondary tier.
    pub fn new(primary: Arc<PrimaryCache>, origin: OriginResolver) -> Self {
        Self {
            primary,
            secondary: None,
            secondary_ttl: Duration::ZERO,
            secondary_timeout: Duration::ZERO,
            origin: Arc::new(origin),
        }
    }

    /// Enables the secondary tier. Values written to it live for `ttl`, and
    /// no single lookup or backfill waits on it longer than `call_timeout`.
    pub fn with_secondary(
        mut self,
        tier: Arc<dyn SecondaryTier>,
        ttl: Duration,
        call_timeout: Duration,
    ) -> Self {
        self.secondary = Some(tier);
        self.secondary_ttl = ttl;
        self.secondary_timeout = call_timeout;
        self
    }

    pub fn stats(&self) -> CacheStats {
        self.primary.stats()
    }

    pub fn secondary_name(&self) -> Option<&'static str> {
        self.secondary.as_ref().map(|tier| tier.name())
    }

    pub fn origin_mode(&self) -> &'static str {
        self.origin.mode_name()
    }

    /// Resolves one request.
    ///
    /// Never fails: origin errors come back as a `NotFound` / `BadGateway`
    /// resolution. Only GET requests touch the cache tiers.
    pub async fn resolve(&self, request: RequestDescriptor) -> Resolution {
        if !request.is_cacheable() {
            return self.pass_through(request).await;
        }

        if let Some(body) = self.primary.get(&request.key) {
            debug!(key = %request.key, "primary hit");
            return Resolution::hit(Tier::Primary, body);
        }

        if let Some(secondary) = &self.secondary {
            // A stalled tier is a miss once its own timeout passes, leaving
            // the rest of the deadline to the origin.
            let lookup_deadline = Instant::now()
                .checked_add(self.secondary_timeout)
                .map_or(request.deadline, |at| at.min(request.deadline));
            match timeout_at(lookup_deadline, secondary.get(&request.key)).await {
                Ok(Some(body)) => {
                    debug!(key = %request.key, tier = secondary.name(), "secondary hit");
                    self.primary.put(request.key.clone(), body.clone());
                    return Resolution::hit(Tier::Secondary, body);
                }
                Ok(None) => {}
                Err(_) => warn!(
                    key = %request.key,
                    tier = secondary.name(),
                    "secondary lookup timed out, treating as miss"
                ),
            }
        }

        self.fetch_and_backfill(request).await
    }

    /// Fetches from the origin in a detached task so that a caller giving up
    /// does not abort the fetch or the backfill.
    ///
    /// Only `200 OK` bodies are cached. The primary is filled before the
    /// answer is returned; the secondary write runs on its own task.
    async fn fetch_and_backfill(&self, request: RequestDescriptor) -> Resolution {
        let primary = Arc::clone(&self.primary);
        let secondary = self.secondary.clone();
        let secondary_ttl = self.secondary_ttl;
        let secondary_timeout = self.secondary_timeout;
        let origin = Arc::clone(&self.origin);

        let task = tokio::spawn(async move {
            let response = match timeout_at(request.deadline, origin.fetch(&request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Resolution::from_error(e),
                Err(_) => {
                    let e = OriginError::Timeout(request.timeout);
                    warn!(key = %request.key, error = %e, "origin deadline exceeded");
                    return Resolution::from_error(e);
                }
            };

            if response.status != StatusCode::OK {
                return Resolution::from_origin(response.status, response.headers, response.body);
            }

            primary.put(request.key.clone(), response.body.clone());
            if let Some(secondary) = secondary {
                let key = request.key;
                let body = response.body.clone();
                tokio::spawn(async move {
                    let write = secondary.set(&key, body, secondary_ttl);
                    if timeout(secondary_timeout, write).await.is_err() {
                        warn!(key = %key, tier = secondary.name(), "secondary backfill timed out");
                    }
                });
            }
            Resolution::from_origin(response.status, response.headers, response.body)
        });

        match task.await {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(error = %e, "origin task failed");
                Resolution::from_error(OriginError::BadGateway("origin task failed".to_string()))
            }
        }
    }

    async fn pass_through(&self, request: RequestDescriptor) -> Resolution {
        match timeout_at(request.deadline, self.origin.fetch(&request)).await {
            Ok(Ok(response)) => {
                Resolution::from_origin(response.status, response.headers, response.body)
            }
            Ok(Err(e)) => Resolution::from_error(e),
            Err(_) => Resolution::from_error(OriginError::Timeout(request.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Outcome;
    use crate::origin::{BackendPool, FileOrigin, ProxyOrigin};
    use async_trait::async_trait;
    use axum::http::{Method, StatusCode};
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct MemoryTier {
        entries: Mutex<HashMap<String, (Bytes, Duration)>>,
        gets: AtomicUsize,
    }

    impl MemoryTier {
        fn with_entry(key: &str, value: &'static [u8]) -> Self {
            let tier = Self::default();
            tier.entries
                .lock()
                .insert(key.to_string(), (Bytes::from_static(value), Duration::from_secs(60)));
            tier
        }

        fn entry(&self, key: &str) -> Option<(Bytes, Duration)> {
            self.entries.lock().get(key).cloned()
        }
    }

    #[async_trait]
    impl SecondaryTier for MemoryTier {
        fn name(&self) -> &'static str {
            "memory"
        }

        async fn get(&self, key: &str) -> Option<Bytes> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().get(key).map(|(value, _)| value.clone())
        }

        async fn set(&self, key: &str, value: Bytes, ttl: Duration) {
            self.entries.lock().insert(key.to_string(), (value, ttl));
        }
    }

    /// Misses every lookup, each call only returning after its delay.
    struct SlowTier {
        get_delay: Duration,
        set_delay: Duration,
    }

    #[async_trait]
    impl SecondaryTier for SlowTier {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn get(&self, _key: &str) -> Option<Bytes> {
            tokio::time::sleep(self.get_delay).await;
            None
        }

        async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) {
            tokio::time::sleep(self.set_delay).await;
        }
    }

    async fn eventually(check: impl Fn() -> bool) -> bool {
        for _ in 0..100 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn proxy_to(server: &MockServer) -> OriginResolver {
        let pool = BackendPool::new(vec![server.uri().parse().unwrap()], 0).unwrap();
        OriginResolver::Proxy(ProxyOrigin::new(pool).unwrap())
    }

    fn file_fixture() -> (TempDir, OriginResolver) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"0123456789").unwrap();
        let origin = OriginResolver::File(FileOrigin::new(dir.path()).unwrap());
        (dir, origin)
    }

    fn get(path: &str) -> RequestDescriptor {
        RequestDescriptor::get(path, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_secondary_hit_backfills_primary() {
        let (_dir, origin) = file_fixture();
        let primary = Arc::new(PrimaryCache::new(10, Duration::from_secs(10)));
        let tier = Arc::new(MemoryTier::with_entry("/k", b"X"));
        let coordinator = CacheCoordinator::new(primary.clone(), origin)
            .with_secondary(tier.clone(), Duration::from_secs(60), Duration::from_secs(1));

        let first = coordinator.resolve(get("/k")).await;
        assert_eq!(first.outcome, Outcome::Success);
        assert_eq!(first.served_by, Some(Tier::Secondary));
        assert_eq!(first.body, Bytes::from_static(b"X"));

        let second = coordinator.resolve(get("/k")).await;
        assert_eq!(second.served_by, Some(Tier::Primary));
        assert_eq!(second.body, Bytes::from_static(b"X"));
        assert_eq!(tier.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_file_miss_populates_both_tiers() {
        let (_dir, origin) = file_fixture();
        let primary = Arc::new(PrimaryCache::new(10, Duration::from_secs(10)));
        let tier = Arc::new(MemoryTier::default());
        let coordinator = CacheCoordinator::new(primary.clone(), origin)
            .with_secondary(tier.clone(), Duration::from_secs(60), Duration::from_secs(1));

        let resolution = coordinator.resolve(get("/a.txt")).await;
        assert_eq!(resolution.outcome, Outcome::Success);
        assert_eq!(resolution.served_by, Some(Tier::Origin));
        assert_eq!(resolution.body.len(), 10);

        assert_eq!(primary.get("/a.txt"), Some(Bytes::from_static(b"0123456789")));
        assert!(eventually(|| tier.entry("/a.txt").is_some()).await);
        let (value, ttl) = tier.entry("/a.txt").unwrap();
        assert_eq!(value.len(), 10);
        assert_eq!(ttl, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_missing_file_caches_nothing() {
        let (_dir, origin) = file_fixture();
        let primary = Arc::new(PrimaryCache::new(10, Duration::from_secs(10)));
        let tier = Arc::new(MemoryTier::default());
        let coordinator = CacheCoordinator::new(primary.clone(), origin)
            .with_secondary(tier.clone(), Duration::from_secs(60), Duration::from_secs(1));

        let resolution = coordinator.resolve(get("/absent.txt")).await;
        assert_eq!(resolution.outcome, Outcome::NotFound);
        assert_eq!(resolution.status, StatusCode::NOT_FOUND);
        assert!(resolution.served_by.is_none());

        assert!(primary.is_empty());
        assert!(tier.entry("/absent.txt").is_none());
    }

    #[tokio::test]
    async fn test_without_secondary_the_origin_result_is_cached() {
        let (_dir, origin) = file_fixture();
        let primary = Arc::new(PrimaryCache::new(10, Duration::from_secs(10)));
        let coordinator = CacheCoordinator::new(primary.clone(), origin);

        assert_eq!(coordinator.resolve(get("/a.txt")).await.served_by, Some(Tier::Origin));
        assert_eq!(coordinator.resolve(get("/a.txt")).await.served_by, Some(Tier::Primary));
        assert_eq!(coordinator.secondary_name(), None);
        assert_eq!(coordinator.origin_mode(), "file");
    }

    #[tokio::test]
    async fn test_non_get_bypasses_tiers() {
        let (_dir, origin) = file_fixture();
        let primary = Arc::new(PrimaryCache::new(10, Duration::from_secs(10)));
        primary.put("/a.txt", Bytes::from_static(b"stale"));
        let tier = Arc::new(MemoryTier::default());
        let coordinator = CacheCoordinator::new(primary.clone(), origin)
            .with_secondary(tier.clone(), Duration::from_secs(60), Duration::from_secs(1));

        let mut request = get("/a.txt");
        request.method = Method::HEAD;
        let resolution = coordinator.resolve(request).await;

        assert_eq!(resolution.served_by, Some(Tier::Origin));
        assert_eq!(resolution.body, Bytes::from_static(b"0123456789"));
        assert_eq!(tier.gets.load(Ordering::SeqCst), 0);
        assert_eq!(primary.get("/a.txt"), Some(Bytes::from_static(b"stale")));
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_relayed_uncached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let origin = proxy_to(&server);
        let primary = Arc::new(PrimaryCache::new(10, Duration::from_secs(10)));
        let coordinator = CacheCoordinator::new(primary.clone(), origin);

        let resolution = coordinator.resolve(get("/busy")).await;
        assert_eq!(resolution.outcome, Outcome::BadGateway);
        assert_eq!(resolution.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resolution.body, Bytes::from_static(b"busy"));
        assert!(primary.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_exceeded_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let origin = proxy_to(&server);
        let primary = Arc::new(PrimaryCache::new(10, Duration::from_secs(10)));
        let coordinator = CacheCoordinator::new(primary.clone(), origin);

        let request = RequestDescriptor::get("/slow", Duration::from_millis(100));
        let resolution = coordinator.resolve(request).await;
        assert_eq!(resolution.outcome, Outcome::BadGateway);
        assert_eq!(resolution.status, StatusCode::BAD_GATEWAY);
        assert!(primary.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_caller_still_populates_primary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let origin = proxy_to(&server);
        let primary = Arc::new(PrimaryCache::new(10, Duration::from_secs(10)));
        let coordinator = CacheCoordinator::new(primary.clone(), origin);

        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), coordinator.resolve(get("/late"))).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(primary.get("/late"), Some(Bytes::from_static(b"late")));
    }

    #[tokio::test]
    async fn test_slow_secondary_write_does_not_delay_response() {
        let (_dir, origin) = file_fixture();
        let primary = Arc::new(PrimaryCache::new(10, Duration::from_secs(10)));
        let tier = SlowTier {
            get_delay: Duration::ZERO,
            set_delay: Duration::from_secs(3),
        };
        let coordinator = CacheCoordinator::new(primary.clone(), origin).with_secondary(
            Arc::new(tier),
            Duration::from_secs(60),
            Duration::from_secs(5),
        );

        let started = std::time::Instant::now();
        let request = RequestDescriptor::get("/a.txt", Duration::from_millis(800));
        let resolution = coordinator.resolve(request).await;

        assert!(started.elapsed() < Duration::from_millis(800));
        assert_eq!(resolution.outcome, Outcome::Success);
        assert_eq!(resolution.served_by, Some(Tier::Origin));
        assert_eq!(primary.get("/a.txt"), Some(Bytes::from_static(b"0123456789")));
    }

    #[tokio::test]
    async fn test_stalled_secondary_lookup_falls_through_to_origin() {
        let (_dir, origin) = file_fixture();
        let primary = Arc::new(PrimaryCache::new(10, Duration::from_secs(10)));
        let tier = SlowTier {
            get_delay: Duration::from_secs(3),
            set_delay: Duration::ZERO,
        };
        let coordinator = CacheCoordinator::new(primary.clone(), origin).with_secondary(
            Arc::new(tier),
            Duration::from_secs(60),
            Duration::from_millis(100),
        );

        let started = std::time::Instant::now();
        let request = RequestDescriptor::get("/a.txt", Duration::from_secs(2));
        let first = coordinator.resolve(request).await;
        assert_eq!(first.outcome, Outcome::Success);
        assert_eq!(first.served_by, Some(Tier::Origin));
        assert_eq!(first.body, Bytes::from_static(b"0123456789"));
        assert!(started.elapsed() < Duration::from_secs(1));

        let second = coordinator.resolve(get("/a.txt")).await;
        assert_eq!(second.served_by, Some(Tier::Primary));
    }

    #[tokio::test]
    async fn test_non_ok_success_is_relayed_uncached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(203).set_body_raw("rewritten", "text/plain"),
            )
            .expect(2)
            .mount(&server)
            .await;

        let primary = Arc::new(PrimaryCache::new(10, Duration::from_secs(10)));
        let tier = Arc::new(MemoryTier::default());
        let coordinator = CacheCoordinator::new(primary.clone(), proxy_to(&server))
            .with_secondary(tier.clone(), Duration::from_secs(60), Duration::from_secs(1));

        for _ in 0..2 {
            let resolution = coordinator.resolve(get("/info")).await;
            assert_eq!(resolution.outcome, Outcome::Success);
            assert_eq!(resolution.status, StatusCode::NON_AUTHORITATIVE_INFORMATION);
            assert_eq!(resolution.served_by, Some(Tier::Origin));
            assert_eq!(resolution.headers["content-type"], "text/plain");
            assert_eq!(resolution.body, Bytes::from_static(b"rewritten"));
        }
        assert!(primary.is_empty());
        assert!(tier.entry("/info").is_none());
    }
}

//! Tiered CDN - an edge cache in front of a file root or a set of backends

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiered_cdn::cache::PrimaryCache;
use tiered_cdn::origin::OriginResolver;
use tiered_cdn::secondary::RedisTier;
use tiered_cdn::{create_router, spawn_cleanup_task, AppState, CacheCoordinator, Config};

/// Main entry point for the edge cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Build the primary cache, the optional Redis tier and the origin
/// 4. Start the background TTL cleanup task if enabled
/// 5. Serve HTTP until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiered_cdn=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tiered CDN edge server");

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        "Configuration loaded: capacity={}, ttl={}s, port={}, cleanup_interval={}s",
        config.cache.capacity,
        config.cache.ttl.as_secs(),
        config.server_port,
        config.cleanup_interval
    );

    let primary = Arc::new(PrimaryCache::new(config.cache.capacity, config.cache.ttl));
    let origin = OriginResolver::from_config(&config.origin).context("invalid origin")?;
    info!(mode = origin.mode_name(), "Origin initialized");

    let mut coordinator = CacheCoordinator::new(primary.clone(), origin);
    if let Some(redis) = &config.redis {
        let tier = RedisTier::connect(redis).context("invalid Redis configuration")?;
        tier.ping().await;
        coordinator = coordinator.with_secondary(Arc::new(tier), redis.ttl, redis.timeout);
    } else {
        info!("Secondary tier disabled");
    }

    let cleanup_handle = spawn_cleanup_task(primary, config.cleanup_interval);

    let app = create_router(AppState::new(coordinator, config.request_timeout));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: Option<tokio::task::JoinHandle<()>>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cleanup task aborted");
    }
}

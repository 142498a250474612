//! API Routes
//!
//! Configures the Axum router: two operational endpoints, everything else
//! falls through to the cache tiers.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{health_handler, resolve_handler, stats_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Primary cache statistics
/// - any other method or path - resolved through the cache tiers
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .fallback(resolve_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

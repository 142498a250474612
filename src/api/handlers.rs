//! API Handlers
//!
//! HTTP request handlers for the operational endpoints and the catch-all
//! handler that resolves everything else through the cache tiers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::coordinator::CacheCoordinator;
use crate::models::{ErrorResponse, HealthResponse, RequestDescriptor, StatsResponse};

/// Largest request body buffered for forwarding.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<CacheCoordinator>,
    /// Deadline budget given to each resolved request
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(coordinator: CacheCoordinator, request_timeout: Duration) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            request_timeout,
        }
    }
}

/// Handler for every path not matched by another route.
///
/// Buffers the body, builds a [`RequestDescriptor`] and answers with the
/// coordinator's resolution.
pub async fn resolve_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(_) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorResponse::new("Request body too large")),
            )
                .into_response()
        }
    };

    let descriptor = RequestDescriptor::from_parts(&parts, body, state.request_timeout);
    state.coordinator.resolve(descriptor).await.into_response()
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let coordinator = &state.coordinator;
    Json(StatsResponse::new(
        &coordinator.stats(),
        coordinator.secondary_name().map(str::to_string),
        coordinator.origin_mode(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

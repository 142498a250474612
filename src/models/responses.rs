//! Response models
//!
//! The coordinator's [`Resolution`] plus the JSON DTOs served by the
//! operational endpoints.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;

use crate::cache::CacheStats;
use crate::error::OriginError;

/// Response header reporting which tier served the request.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Classification of a resolution for the request-handling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NotFound,
    BadGateway,
}

impl Outcome {
    /// Maps an origin status code to an outcome.
    pub fn from_status(status: StatusCode) -> Self {
        if status.is_success() {
            Outcome::Success
        } else if status == StatusCode::NOT_FOUND {
            Outcome::NotFound
        } else {
            Outcome::BadGateway
        }
    }
}

/// The tier that produced a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Primary,
    Secondary,
    Origin,
}

impl Tier {
    /// Value of the `x-cache` header for a response served by this tier.
    pub fn cache_status(self) -> &'static str {
        match self {
            Tier::Primary => "HIT-PRIMARY",
            Tier::Secondary => "HIT-SECONDARY",
            Tier::Origin => "MISS",
        }
    }
}

/// Result of resolving one request through the tiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub outcome: Outcome,
    /// Status to answer with; the upstream status for proxied responses
    pub status: StatusCode,
    /// End-to-end headers relayed from the origin. Empty for cache hits,
    /// which only hold the body.
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Tier that produced `body`, `None` when the origin failed outright
    pub served_by: Option<Tier>,
    pub error: Option<OriginError>,
}

impl Resolution {
    /// A body replayed from a cache tier.
    pub fn hit(tier: Tier, body: Bytes) -> Self {
        Self {
            outcome: Outcome::Success,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body,
            served_by: Some(tier),
            error: None,
        }
    }

    /// A response produced by the origin with its own status and headers.
    pub fn from_origin(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            outcome: Outcome::from_status(status),
            status,
            headers,
            body,
            served_by: Some(Tier::Origin),
            error: None,
        }
    }

    /// An origin failure. Rendered through [`OriginError`]'s own response.
    pub fn from_error(error: OriginError) -> Self {
        let status = error.status();
        Self {
            outcome: Outcome::from_status(status),
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            served_by: None,
            error: Some(error),
        }
    }
}

impl IntoResponse for Resolution {
    fn into_response(self) -> Response {
        let cache_status = self.served_by.map_or("MISS", Tier::cache_status);
        let mut response = match self.error {
            Some(error) => error.into_response(),
            None => {
                let mut response = (self.status, self.body).into_response();
                let headers = response.headers_mut();
                headers.extend(self.headers);
                headers
                    .entry(header::CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static("application/octet-stream"));
                response
            }
        };
        response
            .headers_mut()
            .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(cache_status));
        response
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of primary cache hits
    pub hits: u64,
    /// Number of primary cache misses
    pub misses: u64,
    /// Number of LRU evictions
    pub evictions: u64,
    /// Number of entries dropped after their TTL elapsed
    pub expirations: u64,
    /// Current number of entries in the primary cache
    pub total_entries: usize,
    pub capacity: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Secondary tier in use, if any
    pub secondary: Option<String>,
    /// Origin mode (`file` or `proxy`)
    pub origin: String,
}

impl StatsResponse {
    /// Creates a new StatsResponse from primary cache statistics
    pub fn new(stats: &CacheStats, secondary: Option<String>, origin: impl Into<String>) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
            capacity: stats.capacity,
            hit_rate: stats.hit_rate(),
            secondary,
            origin: origin.into(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for origin failures
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

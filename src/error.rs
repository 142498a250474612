//! Error types for the tiered cache
//!
//! Provides unified error handling using thiserror. Cache misses are never
//! errors; only origin failures and startup configuration problems are.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Origin Error Enum ==
/// Failure to produce a resource from the origin.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OriginError {
    /// Resource does not exist or may not be served
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend could not be reached or answered unusably
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Origin did not answer before the request deadline
    #[error("Origin timed out after {0:?}")]
    Timeout(Duration),
}

impl OriginError {
    /// HTTP status the request-handling layer should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            OriginError::NotFound(_) => StatusCode::NOT_FOUND,
            OriginError::BadGateway(_) | OriginError::Timeout(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for OriginError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.to_string()));
        (self.status(), body).into_response()
    }
}

// == Tier Error Enum ==
/// Failure talking to the secondary tier. Never leaves the tier adapter:
/// it is logged and turned into a miss or a dropped write.
#[derive(Error, Debug)]
pub enum TierError {
    #[error("connection pool: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

// == Config Error Enum ==
/// Invalid startup configuration. Fatal before any request is served.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable holds a value that cannot be parsed
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Unknown origin mode
    #[error("Unknown origin mode {0:?}, expected \"file\" or \"proxy\"")]
    UnknownOriginMode(String),

    /// Proxy mode needs at least one backend
    #[error("No backend configured for proxy mode")]
    NoBackends,

    /// Backend address is not a usable http(s) URL
    #[error("Invalid backend address {address:?}: {reason}")]
    InvalidBackend { address: String, reason: String },

    /// Selected backend index is outside the pool
    #[error("Primary backend index {index} out of range for {len} backend(s)")]
    BackendIndexOutOfRange { index: usize, len: usize },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

// == Result Type Alias ==
/// Convenience Result type for origin resolution.
pub type Result<T> = std::result::Result<T, OriginError>;

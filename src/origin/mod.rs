//! Origin Module
//!
//! Produces a resource on a full miss, either from the local filesystem or
//! by forwarding to a backend.

mod file;
mod proxy;

use std::time::Instant;

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use tracing::{info, warn};

pub use file::FileOrigin;
pub use proxy::{target_url, BackendPool, ProxyOrigin};

use crate::config::OriginMode;
use crate::error::{ConfigError, Result};
use crate::models::RequestDescriptor;

/// What the origin answered.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginResponse {
    pub status: StatusCode,
    /// End-to-end response headers, hop-by-hop ones already removed
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The configured origin. Exactly one mode is active per process.
#[derive(Debug, Clone)]
pub enum OriginResolver {
    File(FileOrigin),
    Proxy(ProxyOrigin),
}

impl OriginResolver {
    /// Builds the origin selected by configuration.
    pub fn from_config(mode: &OriginMode) -> std::result::Result<Self, ConfigError> {
        match mode {
            OriginMode::File { root } => Ok(Self::File(FileOrigin::new(root)?)),
            OriginMode::Proxy { backends, primary } => {
                let pool = BackendPool::new(backends.clone(), *primary)?;
                Ok(Self::Proxy(ProxyOrigin::new(pool)?))
            }
        }
    }

    /// `file` or `proxy`.
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Proxy(_) => "proxy",
        }
    }

    /// Resolves one request against the origin and logs the result.
    pub async fn fetch(&self, request: &RequestDescriptor) -> Result<OriginResponse> {
        let started = Instant::now();
        let result = match self {
            Self::File(origin) => origin.fetch(request.path()).await,
            Self::Proxy(origin) => origin.forward(request).await,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => info!(
                method = %request.method,
                path = %request.path(),
                mode = self.mode_name(),
                status = response.status.as_u16(),
                elapsed_ms,
                "origin request"
            ),
            Err(e) => warn!(
                method = %request.method,
                path = %request.path(),
                mode = self.mode_name(),
                status = e.status().as_u16(),
                elapsed_ms,
                error = %e,
                "origin request failed"
            ),
        }

        result
    }
}

//! Reverse-proxy origin.
//!
//! Forwards a request to one backend of a fixed pool and hands back the
//! upstream status, end-to-end headers and body.

use axum::http::{header, HeaderMap, Uri};
use reqwest::{Client, Url};
use tracing::debug;

use super::OriginResponse;
use crate::error::{ConfigError, OriginError, Result};
use crate::models::RequestDescriptor;

// == Backend Pool ==
/// Ordered backend list, immutable after startup.
#[derive(Debug, Clone)]
pub struct BackendPool {
    backends: Vec<Url>,
    primary: usize,
}

impl BackendPool {
    /// Creates a pool forwarding to `backends[primary]`.
    pub fn new(backends: Vec<Url>, primary: usize) -> std::result::Result<Self, ConfigError> {
        if backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }
        if primary >= backends.len() {
            return Err(ConfigError::BackendIndexOutOfRange {
                index: primary,
                len: backends.len(),
            });
        }
        Ok(Self { backends, primary })
    }

    /// Picks the backend for a request. Always the configured primary; there
    /// is no failover.
    pub fn select(&self, _request: &RequestDescriptor) -> &Url {
        &self.backends[self.primary]
    }
}

// == Proxy Origin ==
/// Forwards full misses to the backend pool.
#[derive(Debug, Clone)]
pub struct ProxyOrigin {
    pool: BackendPool,
    client: Client,
}

impl ProxyOrigin {
    pub fn new(pool: BackendPool) -> std::result::Result<Self, ConfigError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { pool, client })
    }

    /// Sends `request` to the selected backend.
    ///
    /// Transport errors, timeouts and unreadable bodies become
    /// [`OriginError::BadGateway`] / [`OriginError::Timeout`]. Non-2xx
    /// upstream answers are returned as-is; deciding what to cache is the
    /// coordinator's job.
    pub async fn forward(&self, request: &RequestDescriptor) -> Result<OriginResponse> {
        let backend = self.pool.select(request);
        let target = target_url(backend, &request.uri);
        let remaining = request.remaining();
        if remaining.is_zero() {
            return Err(OriginError::Timeout(request.timeout));
        }

        debug!(target_url = %target, "forwarding request");

        let response = self
            .client
            .request(request.method.clone(), target)
            .headers(forwardable_headers(&request.headers))
            .body(request.body.clone())
            .timeout(remaining)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OriginError::Timeout(request.timeout)
                } else if e.is_connect() {
                    OriginError::BadGateway(format!("failed to connect to {backend}: {e}"))
                } else {
                    OriginError::BadGateway(format!("request to {backend} failed: {e}"))
                }
            })?;

        let status = response.status();
        let headers = forwardable_headers(response.headers());
        let body = response.bytes().await.map_err(|e| {
            OriginError::BadGateway(format!("failed to read body from {backend}: {e}"))
        })?;

        Ok(OriginResponse {
            status,
            headers,
            body,
        })
    }
}

/// Joins the backend base path with the request path and keeps the query.
pub fn target_url(backend: &Url, uri: &Uri) -> Url {
    let mut url = backend.clone();
    let base = backend.path().trim_end_matches('/');
    let path = uri.path();
    let joined = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };
    url.set_path(&joined);
    url.set_query(uri.query());
    url
}

/// Copies end-to-end headers in either direction. Hop-by-hop headers are
/// dropped, and so is `Content-Length`, which the sending side recomputes
/// from the body it actually writes.
fn forwardable_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(incoming.len());
    for (name, value) in incoming {
        if is_hop_by_hop_header(name.as_str()) || name == header::CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Hop-by-hop headers (RFC 7230 section 6.1) plus `Host`, which is set for
/// the target instead of forwarded.
fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "proxy-connection"
            | "te"
            | "trailer"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
            | "host"
    )
}

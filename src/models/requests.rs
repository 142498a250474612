//! Request descriptor handed to the coordinator
//!
//! The transport layer parses the inbound HTTP request; the core only sees
//! this owned, already-buffered view of it plus a deadline.

use std::time::Duration;

use axum::http::{request::Parts, HeaderMap, Method, Uri};
use bytes::Bytes;
use tokio::time::Instant;

/// One inbound request as seen by the cache tiers and the origin.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Cache key: the request path, plus `?query` when one is present
    pub key: String,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Time budget the request was admitted with
    pub timeout: Duration,
    /// Point after which network calls made for this request give up
    pub deadline: Instant,
}

impl RequestDescriptor {
    /// Builds a descriptor from the parts of an inbound request.
    pub fn from_parts(parts: &Parts, body: Bytes, timeout: Duration) -> Self {
        Self {
            key: cache_key(&parts.uri),
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            body,
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    /// A bodiless GET for `path`, as used by tests and internal callers.
    pub fn get(path: &str, timeout: Duration) -> Self {
        let uri: Uri = path.parse().unwrap_or_else(|_| Uri::from_static("/"));
        Self {
            key: cache_key(&uri),
            method: Method::GET,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Only GET requests read from or populate the cache tiers.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Derives the cache key for a URI.
pub fn cache_key(uri: &Uri) -> String {
    match uri.query() {
        Some(query) if !query.is_empty() => format!("{}?{}", uri.path(), query),
        _ => uri.path().to_string(),
    }
}

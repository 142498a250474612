//! API Module
//!
//! HTTP handlers and routing for the edge server.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache statistics
//! - fallback - Every other request, served from the cache tiers or origin

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

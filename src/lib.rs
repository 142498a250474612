//! Tiered CDN - an edge cache in front of a file root or a set of backends
//!
//! Requests are answered from an in-process LRU cache, then an optional
//! Redis tier, then the origin, with each miss backfilling the tiers above.

pub mod api;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod origin;
pub mod secondary;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use coordinator::CacheCoordinator;
pub use tasks::spawn_cleanup_task;

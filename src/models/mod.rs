//! Request and Response models
//!
//! The request descriptor consumed by the coordinator, the resolution it
//! produces, and the DTOs served by the operational endpoints.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{cache_key, RequestDescriptor};
pub use responses::{
    ErrorResponse, HealthResponse, Outcome, Resolution, StatsResponse, Tier, CACHE_STATUS_HEADER,
};

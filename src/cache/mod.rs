//! Cache Module
//!
//! Provides the in-process primary tier: a bounded LRU store with absolute
//! per-entry expiry, wrapped for thread-safe shared use.

mod entry;
pub(crate) mod lru;
mod primary;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use primary::PrimaryCache;
pub use stats::CacheStats;
pub use store::EntryStore;

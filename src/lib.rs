//! Cost Cache - An in-memory key-value cache with cost-aware eviction
//!
//! Entries carry a caller-assigned cost. When the total cost or the entry
//! count goes over its limit, the least recently touched entries are
//! evicted, and an optional, weakly held delegate is told about each one
//! just before it goes.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{Cache, CacheDelegate, CacheKey, CacheStats, CacheStore};
pub use config::{CacheConfig, RecencyPolicy};
pub use error::{CacheError, Result};

//! Cache Module
//!
//! Provides in-memory caching with cost accounting, deterministic eviction
//! and an eviction delegate.

use std::hash::Hash;

mod delegate;
mod entry;
mod guard;
mod order;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use delegate::CacheDelegate;
pub use entry::CacheEntry;
pub use order::EvictionOrder;
pub use shared::Cache;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Cache Key ==
/// Requirements on cache keys: hashable, comparable and cheap enough to
/// clone once per insertion (the eviction order keeps its own copy).
pub trait CacheKey: Hash + Eq + Clone {}

impl<T: Hash + Eq + Clone> CacheKey for T {}

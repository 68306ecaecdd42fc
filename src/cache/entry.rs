//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with cost accounting.

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Caller-assigned cost counted against the cost limit
    pub cost: u64,
    /// Handle of this entry's node in the eviction order
    pub(crate) slot: usize,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry linked to the given order slot.
    pub(crate) fn new(value: V, cost: u64, slot: usize) -> Self {
        Self { value, cost, slot }
    }

    // == Replace ==
    /// Swaps in a new value and cost, returning the old value.
    ///
    /// The cost is replaced, not summed. Returns the previous value and
    /// cost so the caller can adjust its running total.
    pub(crate) fn replace(&mut self, value: V, cost: u64) -> (V, u64) {
        let old_cost = std::mem::replace(&mut self.cost, cost);
        (std::mem::replace(&mut self.value, value), old_cost)
    }
}

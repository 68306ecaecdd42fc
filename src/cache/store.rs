//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with an eviction order and
//! cost accounting. `CacheStore` is not synchronized; [`crate::Cache`]
//! wraps it in a lock and wires in the delegate.
//!
//! Every operation that drops an entry takes a `notify` callback. It is
//! invoked with the entry's value while the entry is still stored, then the
//! entry is unlinked.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use tracing::{debug, trace};

use crate::cache::{CacheEntry, CacheStats, EvictionOrder};
use crate::config::{CacheConfig, RecencyPolicy};

// == Cache Store ==
/// Cost-bounded storage with deterministic eviction.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// Eviction priority, least valuable first
    order: EvictionOrder<K>,
    /// Sum of all entry costs; wide enough that it cannot overflow
    total_cost: u128,
    /// Maximum total cost, `None` = unbounded
    cost_limit: Option<u64>,
    /// Maximum number of entries, `None` = unbounded
    count_limit: Option<usize>,
    recency_policy: RecencyPolicy,
    stats: CacheStats,
}

impl<K, V> Default for CacheStore<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl<K, V> CacheStore<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates a new CacheStore with the given limits and policy.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            order: EvictionOrder::new(),
            total_cost: 0,
            cost_limit: config.cost_limit,
            count_limit: config.count_limit,
            recency_policy: config.recency_policy,
            stats: CacheStats::new(),
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Under [`RecencyPolicy::Lru`] a hit marks the key as most recently
    /// touched. Never evicts.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.get(key) {
            Some(entry) => {
                if self.recency_policy.refreshes_on_read() {
                    self.order.touch(entry.slot);
                }
                self.stats.record_hit();
                Some(&entry.value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Peek ==
    /// Retrieves a value without touching the order or the statistics.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|entry| &entry.value)
    }

    // == Set ==
    /// Stores a value under `key` with the given cost, then enforces limits.
    ///
    /// If the key already exists, its value and cost are replaced (cost is
    /// not summed) and the previous value is returned. Replacement is not
    /// an eviction: `notify` never sees the replaced value. It does see any
    /// victims of the enforcement pass, which may include the new entry.
    pub fn set_with<F>(&mut self, key: K, value: V, cost: u64, notify: F) -> Option<V>
    where
        F: FnMut(&V),
    {
        let replaced = self.insert(key, value, cost);
        self.enforce_limits(notify);
        replaced
    }

    fn insert(&mut self, key: K, value: V, cost: u64) -> Option<V> {
        if let Some(entry) = self.entries.get_mut(&key) {
            let (previous, old_cost) = entry.replace(value, cost);
            self.order.touch(entry.slot);
            self.total_cost = self.total_cost - u128::from(old_cost) + u128::from(cost);
            trace!("Replaced entry (cost {} -> {})", old_cost, cost);
            return Some(previous);
        }

        let slot = self.order.push_back(key.clone());
        self.entries.insert(key, CacheEntry::new(value, cost, slot));
        self.total_cost += u128::from(cost);
        trace!("Inserted entry with cost {}", cost);
        None
    }

    // == Remove ==
    /// Removes an entry by key, notifying before it is unlinked.
    ///
    /// Absent keys are a no-op and return `None`.
    pub fn remove_with<Q, F>(&mut self, key: &Q, mut notify: F) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnMut(&V),
    {
        notify(&self.entries.get(key)?.value);

        let entry = self.entries.remove(key)?;
        self.order.remove(entry.slot);
        self.total_cost -= u128::from(entry.cost);
        self.stats.record_removal();
        Some(entry.value)
    }

    // == Clear ==
    /// Removes every entry, notifying from least to most valuable first.
    ///
    /// Returns the number of entries removed.
    pub fn clear_with<F>(&mut self, mut notify: F) -> usize
    where
        F: FnMut(&V),
    {
        for key in self.order.iter() {
            if let Some(entry) = self.entries.get(key) {
                notify(&entry.value);
            }
        }

        let removed = self.entries.len();
        self.entries.clear();
        self.order.clear();
        self.total_cost = 0;
        self.stats.removals += removed as u64;
        if removed > 0 {
            debug!("Cleared {} entries", removed);
        }
        removed
    }

    // == Enforce Limits ==
    /// Evicts least valuable entries until both limits are satisfied.
    ///
    /// Each iteration removes one entry, so the pass ends after at most
    /// `len()` evictions even when a single entry exceeds the cost limit.
    /// Returns the number of entries evicted.
    pub fn enforce_limits<F>(&mut self, mut notify: F) -> usize
    where
        F: FnMut(&V),
    {
        let mut evicted = 0;

        while self.is_over_limit() {
            let Some(victim) = self
                .order
                .front()
                .and_then(|(_, key)| self.entries.get(key))
            else {
                break;
            };
            let cost = victim.cost;
            notify(&victim.value);

            if let Some(key) = self.order.pop_front() {
                self.entries.remove(&key);
            }
            self.total_cost -= u128::from(cost);
            self.stats.record_eviction();
            evicted += 1;
            trace!("Evicted entry with cost {}", cost);
        }

        if evicted > 0 {
            debug!(
                "Eviction pass removed {} entries (total cost now {}, {} entries left)",
                evicted,
                self.total_cost,
                self.entries.len()
            );
        }
        evicted
    }

    /// Returns true if either configured limit is currently exceeded.
    pub fn is_over_limit(&self) -> bool {
        let over_cost = self
            .cost_limit
            .is_some_and(|limit| self.total_cost > u128::from(limit));
        let over_count = self
            .count_limit
            .is_some_and(|limit| self.entries.len() > limit);
        over_cost || over_count
    }

    // == Limits ==
    /// Replaces the cost limit. Takes effect on the next enforcement pass.
    pub fn set_cost_limit(&mut self, limit: Option<u64>) {
        self.cost_limit = limit;
    }

    /// Replaces the count limit. Takes effect on the next enforcement pass.
    pub fn set_count_limit(&mut self, limit: Option<usize>) {
        self.count_limit = limit;
    }

    pub fn cost_limit(&self) -> Option<u64> {
        self.cost_limit
    }

    pub fn count_limit(&self) -> Option<usize> {
        self.count_limit
    }

    pub fn recency_policy(&self) -> RecencyPolicy {
        self.recency_policy
    }

    // == Accessors ==
    /// Returns the sum of all entry costs, saturating at `u64::MAX`.
    pub fn total_cost(&self) -> u64 {
        u64::try_from(self.total_cost).unwrap_or(u64::MAX)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Iterates keys from least to most valuable, i.e. in eviction order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.total_cost = self.total_cost();
        stats
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Panics if the map, the order and the running cost disagree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(self.order.len(), self.entries.len(), "order/entries size mismatch");
        let mut seen = std::collections::HashSet::new();
        for key in self.order.iter() {
            assert!(seen.insert(key), "key listed twice in order");
            assert!(self.entries.contains_key(key), "order lists unknown key");
        }
        let sum: u128 = self.entries.values().map(|e| u128::from(e.cost)).sum();
        assert_eq!(sum, self.total_cost, "total cost drifted from entry costs");
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn store(config: CacheConfig) -> CacheStore<String, &'static str> {
        CacheStore::new(&config)
    }

    fn set(store: &mut CacheStore<String, &'static str>, key: &str, value: &'static str, cost: u64) {
        store.set_with(key.to_string(), value, cost, |_| {});
    }

    fn order(store: &CacheStore<String, &'static str>) -> Vec<String> {
        store.keys().cloned().collect()
    }

    #[test]
    fn test_store_new() {
        let store = store(CacheConfig::default());
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.total_cost(), 0);
        assert!(!store.is_over_limit());
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = store(CacheConfig::default());

        set(&mut store, "key1", "value1", 3);

        assert_eq!(store.get("key1"), Some(&"value1"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_cost(), 3);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = store(CacheConfig::default());
        assert_eq!(store.get("nonexistent"), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_overwrite_replaces_cost() {
        let mut store = store(CacheConfig::default());

        set(&mut store, "key1", "value1", 5);
        let replaced = store.set_with("key1".to_string(), "value2", 2, |_| {
            panic!("replacement must not notify")
        });

        assert_eq!(replaced, Some("value1"));
        assert_eq!(store.peek("key1"), Some(&"value2"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_cost(), 2);
        store.assert_consistent();
    }

    #[test]
    fn test_store_overwrite_refreshes_position() {
        let mut store = store(CacheConfig::default());

        set(&mut store, "a", "1", 0);
        set(&mut store, "b", "2", 0);
        set(&mut store, "a", "3", 0);

        assert_eq!(order(&store), vec!["b", "a"]);
    }

    #[test]
    fn test_store_remove_notifies_before_unlink() {
        let mut store = store(CacheConfig::default());
        set(&mut store, "key1", "value1", 4);

        let mut seen = Vec::new();
        let removed = store.remove_with("key1", |value| seen.push(*value));

        assert_eq!(removed, Some("value1"));
        assert_eq!(seen, vec!["value1"]);
        assert!(store.is_empty());
        assert_eq!(store.total_cost(), 0);
        assert_eq!(store.stats().removals, 1);
        store.assert_consistent();
    }

    #[test]
    fn test_store_remove_nonexistent() {
        let mut store = store(CacheConfig::default());

        let removed = store.remove_with("nonexistent", |_| panic!("nothing to notify"));

        assert_eq!(removed, None);
        assert_eq!(store.stats().removals, 0);
    }

    #[test]
    fn test_store_clear_notifies_in_eviction_order() {
        let mut store = store(CacheConfig::default());
        set(&mut store, "a", "A", 1);
        set(&mut store, "b", "B", 1);
        set(&mut store, "c", "C", 1);
        store.get("a");

        let mut seen = Vec::new();
        let removed = store.clear_with(|value| seen.push(*value));

        assert_eq!(removed, 3);
        assert_eq!(seen, vec!["B", "C", "A"]);
        assert!(store.is_empty());
        assert_eq!(store.total_cost(), 0);
        assert_eq!(store.stats().removals, 3);
        store.assert_consistent();
    }

    #[test]
    fn test_store_cost_eviction() {
        let mut store = store(CacheConfig::new().with_cost_limit(10));
        let mut evicted = Vec::new();

        store.set_with("a".to_string(), "A", 5, |v| evicted.push(*v));
        store.set_with("b".to_string(), "B", 5, |v| evicted.push(*v));
        store.set_with("c".to_string(), "C", 5, |v| evicted.push(*v));

        assert_eq!(evicted, vec!["A"]);
        assert_eq!(store.peek("a"), None);
        assert_eq!(store.peek("b"), Some(&"B"));
        assert_eq!(store.peek("c"), Some(&"C"));
        assert_eq!(store.total_cost(), 10);
        assert_eq!(store.stats().evictions, 1);
        store.assert_consistent();
    }

    #[test]
    fn test_store_count_eviction() {
        let mut store = store(CacheConfig::new().with_count_limit(3));

        set(&mut store, "key1", "value1", 0);
        set(&mut store, "key2", "value2", 0);
        set(&mut store, "key3", "value3", 0);
        set(&mut store, "key4", "value4", 0);

        assert_eq!(store.len(), 3);
        assert_eq!(order(&store), vec!["key2", "key3", "key4"]);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = store(CacheConfig::new().with_count_limit(3));

        set(&mut store, "key1", "value1", 0);
        set(&mut store, "key2", "value2", 0);
        set(&mut store, "key3", "value3", 0);

        // Access key1 to make it most recently used
        store.get("key1");

        // Adding key4 should evict key2 (now oldest)
        set(&mut store, "key4", "value4", 0);

        assert!(store.contains_key("key1"));
        assert!(!store.contains_key("key2"));
    }

    #[test]
    fn test_store_write_order_ignores_get() {
        let config = CacheConfig::new()
            .with_count_limit(3)
            .with_recency_policy(RecencyPolicy::WriteOrder);
        let mut store = store(config);

        set(&mut store, "key1", "value1", 0);
        set(&mut store, "key2", "value2", 0);
        set(&mut store, "key3", "value3", 0);
        assert_eq!(store.get("key1"), Some(&"value1"));

        set(&mut store, "key4", "value4", 0);

        assert!(!store.contains_key("key1"));
        assert!(store.contains_key("key2"));
    }

    #[test]
    fn test_store_oversized_entry_evicted_immediately() {
        let mut store = store(CacheConfig::new().with_cost_limit(10));
        let mut evicted = Vec::new();

        store.set_with("x".to_string(), "X", 100, |v| evicted.push(*v));

        assert_eq!(evicted, vec!["X"]);
        assert!(store.is_empty());
        assert_eq!(store.total_cost(), 0);
    }

    #[test]
    fn test_store_oversized_entry_evicts_everything_older() {
        let mut store = store(CacheConfig::new().with_cost_limit(10));
        let mut evicted = Vec::new();

        store.set_with("a".to_string(), "A", 4, |v| evicted.push(*v));
        store.set_with("b".to_string(), "B", 4, |v| evicted.push(*v));
        store.set_with("x".to_string(), "X", 11, |v| evicted.push(*v));

        assert_eq!(evicted, vec!["A", "B", "X"]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_lowering_limit_needs_enforcement() {
        let mut store = store(CacheConfig::default());
        set(&mut store, "a", "A", 3);
        set(&mut store, "b", "B", 3);

        store.set_cost_limit(Some(3));
        assert!(store.is_over_limit());

        let evicted = store.enforce_limits(|_| {});
        assert_eq!(evicted, 1);
        assert_eq!(order(&store), vec!["b"]);
        assert!(!store.is_over_limit());
    }

    #[test]
    fn test_store_zero_cost_entries_ignore_cost_limit() {
        let mut store = store(CacheConfig::new().with_cost_limit(0));

        set(&mut store, "a", "A", 0);
        set(&mut store, "b", "B", 0);

        assert_eq!(store.len(), 2);
        assert_eq!(store.total_cost(), 0);
    }

    #[test]
    fn test_store_huge_costs_do_not_overflow() {
        let mut store = store(CacheConfig::default());

        set(&mut store, "a", "A", u64::MAX);
        set(&mut store, "b", "B", u64::MAX);
        assert_eq!(store.total_cost(), u64::MAX);

        store.remove_with("a", |_| {});
        assert_eq!(store.total_cost(), u64::MAX);
        store.assert_consistent();
    }

    #[test]
    fn test_store_stats() {
        let mut store = store(CacheConfig::default());

        set(&mut store, "key1", "value1", 6);
        store.get("key1"); // hit
        store.get("nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_cost, 6);
    }
}

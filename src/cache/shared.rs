//! Shared Cache Module
//!
//! Thread-safe public surface over [`CacheStore`]: one lock guards the
//! entries, the eviction order and the running cost together, and every
//! entry that leaves the cache is reported to the delegate first.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::delegate::DelegateSlot;
use crate::cache::guard::{self, NotifyScope};
use crate::cache::{CacheDelegate, CacheKey, CacheStats, CacheStore};
use crate::config::{CacheConfig, RecencyPolicy};
use crate::error::{CacheError, Result};

// == Cache ==
/// In-memory key-value cache with cost-aware eviction.
///
/// All operations are synchronous and run on the caller's thread. The
/// delegate is notified while the store lock is held; from inside that
/// callback every operation on the same cache is rejected. The `try_*`
/// methods report this as [`CacheError::Reentrant`], the plain methods log
/// a warning and return their type's default (`None`, `0`, `false`, ...).
///
/// # Example
/// ```
/// use cost_cache::{Cache, CacheConfig};
///
/// let cache = Cache::with_config(CacheConfig::new().with_cost_limit(10));
/// cache.set_with_cost("a", 1, 5);
/// cache.set_with_cost("b", 2, 5);
/// cache.set_with_cost("c", 3, 5); // evicts "a"
///
/// assert_eq!(cache.get(&"a"), None);
/// assert_eq!(cache.total_cost(), 10);
/// ```
pub struct Cache<K: CacheKey, V> {
    id: u64,
    store: Mutex<CacheStore<K, V>>,
    delegate: DelegateSlot<K, V>,
}

impl<K: CacheKey, V> Cache<K, V> {
    // == Constructors ==
    /// Creates an unbounded LRU cache.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with the given limits and recency policy.
    pub fn with_config(config: CacheConfig) -> Self {
        debug!(
            "Creating cache: cost_limit={:?}, count_limit={:?}, policy={}",
            config.cost_limit, config.count_limit, config.recency_policy
        );
        Self {
            id: guard::next_cache_id(),
            store: Mutex::new(CacheStore::new(&config)),
            delegate: DelegateSlot::new(),
        }
    }

    // == Delegate ==
    /// Registers `delegate`, replacing any previous one.
    ///
    /// Only a weak reference is kept; once the last `Arc` is dropped,
    /// notifications silently stop.
    pub fn set_delegate<D>(&self, delegate: &Arc<D>)
    where
        D: CacheDelegate<K, V> + 'static,
    {
        let weak: Weak<dyn CacheDelegate<K, V>> = Arc::downgrade(delegate) as _;
        self.delegate.set(weak);
    }

    /// Unregisters the delegate.
    pub fn clear_delegate(&self) {
        self.delegate.clear();
    }

    /// Returns the registered delegate if it is still alive.
    pub fn delegate(&self) -> Option<Arc<dyn CacheDelegate<K, V>>> {
        self.delegate.upgrade()
    }

    // == Get ==
    /// Returns a clone of the value stored under `key`.
    ///
    /// A hit refreshes the key's eviction position under
    /// [`RecencyPolicy::Lru`]. Never evicts.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        or_default(self.try_get(key))
    }

    pub fn try_get<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.with_store("get", |store| store.get(key).cloned())
    }

    // == Set ==
    /// Stores `value` under `key` with a cost of 0.
    pub fn set(&self, key: K, value: V) {
        self.set_with_cost(key, value, 0);
    }

    /// Stores `value` under `key` with the given cost, then evicts least
    /// valuable entries until the limits hold again.
    ///
    /// The replaced value, if any, is dropped without notifying the
    /// delegate. The new entry itself is evicted right away if its cost
    /// alone exceeds the cost limit.
    pub fn set_with_cost(&self, key: K, value: V, cost: u64) {
        or_default(self.try_set_with_cost(key, value, cost).map(drop));
    }

    /// Like [`Cache::set`], returning the replaced value.
    pub fn try_set(&self, key: K, value: V) -> Result<Option<V>> {
        self.try_set_with_cost(key, value, 0)
    }

    /// Like [`Cache::set_with_cost`], returning the replaced value.
    pub fn try_set_with_cost(&self, key: K, value: V, cost: u64) -> Result<Option<V>> {
        self.with_store("set", |store| {
            store.set_with(key, value, cost, |victim| self.notify(victim))
        })
    }

    // == Remove ==
    /// Removes `key`, notifying the delegate before the entry disappears.
    ///
    /// Returns the removed value; absent keys are a no-op.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        or_default(self.try_remove(key))
    }

    pub fn try_remove<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.with_store("remove", |store| {
            store.remove_with(key, |value| self.notify(value))
        })
    }

    /// Removes every entry, notifying the delegate once per entry from
    /// least to most valuable. Returns the number of entries removed.
    pub fn remove_all(&self) -> usize {
        or_default(self.try_remove_all())
    }

    pub fn try_remove_all(&self) -> Result<usize> {
        self.with_store("remove_all", |store| {
            store.clear_with(|value| self.notify(value))
        })
    }

    // == Limits ==
    /// Runs an eviction pass. Useful as the hook for external pressure
    /// signals; the cache already does this after every `set`.
    pub fn enforce_limits(&self) -> usize {
        or_default(self.try_enforce_limits())
    }

    pub fn try_enforce_limits(&self) -> Result<usize> {
        self.with_store("enforce_limits", |store| {
            store.enforce_limits(|victim| self.notify(victim))
        })
    }

    /// Replaces the cost limit and evicts immediately if it is now exceeded.
    ///
    /// Returns the number of entries evicted.
    pub fn set_cost_limit(&self, limit: Option<u64>) -> usize {
        or_default(self.with_store("set_cost_limit", |store| {
            debug!("Cost limit changed: {:?} -> {:?}", store.cost_limit(), limit);
            store.set_cost_limit(limit);
            store.enforce_limits(|victim| self.notify(victim))
        }))
    }

    /// Replaces the count limit and evicts immediately if it is now exceeded.
    ///
    /// Returns the number of entries evicted.
    pub fn set_count_limit(&self, limit: Option<usize>) -> usize {
        or_default(self.with_store("set_count_limit", |store| {
            debug!("Count limit changed: {:?} -> {:?}", store.count_limit(), limit);
            store.set_count_limit(limit);
            store.enforce_limits(|victim| self.notify(victim))
        }))
    }

    pub fn cost_limit(&self) -> Option<u64> {
        or_default(self.with_store("cost_limit", |store| store.cost_limit()))
    }

    pub fn count_limit(&self) -> Option<usize> {
        or_default(self.with_store("count_limit", |store| store.count_limit()))
    }

    pub fn recency_policy(&self) -> RecencyPolicy {
        or_default(self.with_store("recency_policy", |store| store.recency_policy()))
    }

    // == Accessors ==
    /// Returns true if `key` is stored. Does not affect eviction order.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        or_default(self.with_store("contains_key", |store| store.contains_key(key)))
    }

    pub fn len(&self) -> usize {
        or_default(self.with_store("len", |store| store.len()))
    }

    pub fn is_empty(&self) -> bool {
        or_default(self.with_store("is_empty", |store| store.is_empty()))
    }

    /// Returns the sum of all entry costs.
    pub fn total_cost(&self) -> u64 {
        or_default(self.with_store("total_cost", |store| store.total_cost()))
    }

    /// Returns the stored keys from least to most valuable.
    pub fn keys(&self) -> Vec<K> {
        or_default(self.with_store("keys", |store| store.keys().cloned().collect()))
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        or_default(self.with_store("stats", |store| store.stats()))
    }

    // == Internals ==
    /// Runs `f` under the store lock, unless this thread is already inside
    /// one of this cache's delegate callbacks.
    fn with_store<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut CacheStore<K, V>) -> T,
    {
        if guard::is_notifying(self.id) {
            return Err(CacheError::Reentrant(operation));
        }
        let mut store = self.store.lock();
        Ok(f(&mut store))
    }

    fn notify(&self, value: &V) {
        if let Some(delegate) = self.delegate.upgrade() {
            let _scope = NotifyScope::enter(self.id);
            delegate.will_evict(self, value);
        }
    }
}

/// Unwraps a result, logging and defaulting on a rejected call.
fn or_default<T: Default>(result: Result<T>) -> T {
    result.unwrap_or_else(|err| {
        warn!("{}", err);
        T::default()
    })
}

impl<K: CacheKey, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: CacheKey, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Cache");
        s.field("id", &self.id);
        // try_lock keeps Debug usable from inside a delegate callback
        if let Some(store) = self.store.try_lock() {
            s.field("len", &store.len())
                .field("total_cost", &store.total_cost())
                .field("cost_limit", &store.cost_limit())
                .field("count_limit", &store.count_limit());
        }
        s.finish_non_exhaustive()
    }
}

/// Tearing the cache down is the same as `remove_all`: a live delegate
/// hears about every remaining entry.
impl<K: CacheKey, V> Drop for Cache<K, V> {
    fn drop(&mut self) {
        if self.delegate.upgrade().is_some() {
            self.remove_all();
        }
    }
}

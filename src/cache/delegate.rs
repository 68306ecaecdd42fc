//! Eviction Delegate Module
//!
//! Defines the observer hook that runs just before an entry leaves the
//! cache, and the weak slot that holds it.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::cache::{Cache, CacheKey};

// == Cache Delegate ==
/// Receives a synchronous callback before an entry is evicted or removed.
///
/// The callback runs while the cache's store lock is held, so the entry
/// is still stored when `will_evict` is called. Calling back into the same
/// cache from inside the callback is rejected with
/// [`CacheError::Reentrant`](crate::CacheError::Reentrant); registering or
/// clearing the delegate is allowed.
///
/// It is not called when a value is replaced by `set` under the same key.
pub trait CacheDelegate<K: CacheKey, V>: Send + Sync {
    /// Called once per entry, strictly before it is unlinked.
    ///
    /// The default implementation does nothing.
    fn will_evict(&self, _cache: &Cache<K, V>, _value: &V) {}
}

// == Delegate Slot ==
/// Holds at most one delegate without keeping it alive.
pub(crate) struct DelegateSlot<K: CacheKey, V> {
    inner: RwLock<Option<Weak<dyn CacheDelegate<K, V>>>>,
}

impl<K: CacheKey, V> DelegateSlot<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    pub(crate) fn set(&self, delegate: Weak<dyn CacheDelegate<K, V>>) {
        *self.inner.write() = Some(delegate);
    }

    pub(crate) fn clear(&self) {
        *self.inner.write() = None;
    }

    /// Returns the delegate if one is registered and still alive.
    ///
    /// The read lock is released before returning, so the delegate may
    /// swap itself out while it is being notified.
    pub(crate) fn upgrade(&self) -> Option<Arc<dyn CacheDelegate<K, V>>> {
        self.inner.read().as_ref().and_then(Weak::upgrade)
    }
}

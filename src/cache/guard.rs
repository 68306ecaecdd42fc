//! Reentrancy Guard Module
//!
//! Remembers, per thread, which caches are currently inside a delegate
//! callback. A cache consults this before taking its store lock so that a
//! callback calling back into the same cache fails instead of deadlocking.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static NOTIFYING: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// Hands out a process-unique cache identifier.
pub(crate) fn next_cache_id() -> u64 {
    NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Returns true if the current thread is notifying a delegate of `cache_id`.
pub(crate) fn is_notifying(cache_id: u64) -> bool {
    NOTIFYING.with(|ids| ids.borrow().contains(&cache_id))
}

// == Notify Scope ==
/// Marks `cache_id` as notifying on this thread until dropped.
///
/// Drop runs during unwinding too, so a panicking delegate does not leave
/// the cache permanently flagged.
pub(crate) struct NotifyScope {
    cache_id: u64,
}

impl NotifyScope {
    pub(crate) fn enter(cache_id: u64) -> Self {
        NOTIFYING.with(|ids| ids.borrow_mut().push(cache_id));
        Self { cache_id }
    }
}

impl Drop for NotifyScope {
    fn drop(&mut self) {
        NOTIFYING.with(|ids| {
            let mut ids = ids.borrow_mut();
            if let Some(pos) = ids.iter().rposition(|&id| id == self.cache_id) {
                ids.remove(pos);
            }
        });
    }
}

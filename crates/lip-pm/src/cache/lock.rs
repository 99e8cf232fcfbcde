//! Per-key locks for cache entries
//!
//! Serializes the check-then-fetch sequence for a single cache key inside one
//! process. Different keys never contend. Locking across processes is not
//! provided.

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;

type KeyMutex = Arc<Mutex<()>>;

/// Lock table keyed by cache file name
///
/// An entry lives only while some caller holds or waits for its key.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<String, KeyMutex>>,
}

/// Guard held while a cache key is being checked or fetched
///
/// Dropping it releases the key and removes the table entry when no other
/// caller holds or waits for the same key.
pub struct KeyGuard<'a> {
    table: &'a KeyLocks,
    key: String,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `key` is free and return its guard
    pub fn acquire(&self, key: &str) -> KeyGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        KeyGuard {
            table: self,
            key: key.to_string(),
            guard: Some(lock.lock_arc()),
        }
    }

    /// Number of keys currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Waiters clone the entry under the table lock, so holding it here
        // makes the strong count exact.
        let mut locks = self.table.locks.lock();
        drop(self.guard.take());
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

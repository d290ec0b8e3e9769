//! Bounded least-recently-used cache
//!
//! The lock is held only for a lookup or an insert. Values are computed
//! outside it, so two threads may compute the same key; the first insert
//! wins and both callers get that value. A poisoned lock never fails a
//! lookup, the cache is just skipped.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use tracing::warn;

#[derive(Debug)]
pub struct BoundedCache<V> {
    /// `None` when caching is disabled
    entries: Option<Mutex<LruCache<String, V>>>,
}

impl<V: Clone> BoundedCache<V> {
    /// A capacity of zero disables caching
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut guard = match self.entries.as_ref()?.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(key, "cache lock poisoned, skipping lookup");
                return None;
            }
        };
        guard.get(key).cloned()
    }

    /// Insert unless already present; returns the value now cached for `key`
    pub fn insert(&self, key: String, value: V) -> V {
        let Some(entries) = self.entries.as_ref() else {
            return value;
        };
        let mut guard = match entries.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(key = key.as_str(), "cache lock poisoned, value not cached");
                return value;
            }
        };
        if let Some(existing) = guard.get(&key) {
            return existing.clone();
        }
        guard.put(key, value.clone());
        value
    }

    /// Cached value, or compute, cache and return it. Errors are not cached.
    pub fn get_or_try_insert_with<E, F>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = compute()?;
        Ok(self.insert(key.to_string(), value))
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .and_then(|entries| entries.lock().ok().map(|guard| guard.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

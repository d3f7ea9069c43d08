//! Caller-owned expiring cache
//!
//! Small memoization layer for values that are costly to recompute and may
//! be a little stale (system statistics, online counts). Each owner builds
//! its own cache with its own TTL; there is no global instance.

use crate::clock::SharedClock;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

struct Slot<V> {
    value: V,
    expires_at: u64,
}

/// Map whose entries disappear `ttl` after insertion
pub struct TtlCache<K, V> {
    entries: HashMap<K, Slot<V>>,
    ttl_millis: u64,
    clock: SharedClock,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        TtlCache {
            entries: HashMap::new(),
            ttl_millis: ttl.as_millis() as u64,
            clock,
        }
    }

    /// Fresh value for `key`, if any
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now_millis();
        self.entries
            .get(key)
            .filter(|slot| slot.expires_at > now)
            .map(|slot| slot.value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        let expires_at = self.clock.now_millis().saturating_add(self.ttl_millis);
        self.entries.insert(key, Slot { value, expires_at });
    }

    /// Return the cached value or compute, store and return a new one
    pub fn get_or_insert_with(&mut self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Drop stale entries, returning how many went away
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_millis();
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.expires_at > now);
        before - self.entries.len()
    }

    /// Number of entries, stale ones included until purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    #[test]
    fn test_entries_expire_with_the_clock() {
        let clock = Arc::new(ManualClock::new(0));
        let mut cache = TtlCache::new(Duration::from_secs(300), clock.clone());

        cache.insert("anon", 4u64);
        assert_eq!(cache.get(&"anon"), Some(4));

        clock.advance(299_999);
        assert_eq!(cache.get(&"anon"), Some(4));

        clock.advance(1);
        assert_eq!(cache.get(&"anon"), None);
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_or_insert_with_computes_once_per_window() {
        let clock = Arc::new(ManualClock::new(0));
        let mut cache = TtlCache::new(Duration::from_millis(10), clock.clone());
        let mut calls = 0;

        for _ in 0..3 {
            cache.get_or_insert_with("stats", || {
                calls += 1;
                calls
            });
        }
        assert_eq!(calls, 1);

        clock.advance(10);
        let value = cache.get_or_insert_with("stats", || {
            calls += 1;
            calls
        });
        assert_eq!(value, 2);
    }
}

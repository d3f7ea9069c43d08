//! In-memory keyspace

use super::entry::Entry;
use super::search::SearchIndex;
use super::value::Value;
use super::EXPIRE_AT_FIELD;
use crate::clock::{self, SharedClock};
use bytes::Bytes;
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;

type StoreMap = HashMap<Bytes, Entry, BuildHasherDefault<SipHasher13>>;

/// A change to the set of pending key deadlines, for timer-driven expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerChange {
    /// `key` now expires at the given Unix ms
    Schedule(Bytes, u64),
    /// `key` is gone and its deadline no longer applies
    Cancel(Bytes),
    /// The keyspace was flushed
    CancelAll,
}

/// The keyspace of one shard (or of the whole memory backend)
///
/// Expired entries are dropped lazily whenever they are touched, and in bulk
/// by [`MemoryStore::cleanup_expired`] or [`MemoryStore::expire_if_due`].
pub struct MemoryStore {
    store: StoreMap,

    /// Search indexes, by namespace key; not part of the keyspace
    search: HashMap<Bytes, SearchIndex>,

    clock: SharedClock,

    /// Deadline changes since the last call to `take_timer_changes`
    timer_changes: Vec<TimerChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_clock(capacity, clock::system())
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self::with_capacity_and_clock(1024, clock)
    }

    pub fn with_capacity_and_clock(capacity: usize, clock: SharedClock) -> Self {
        MemoryStore {
            store: HashMap::with_capacity_and_hasher(
                capacity,
                BuildHasherDefault::<SipHasher13>::default(),
            ),
            search: HashMap::new(),
            clock,
            timer_changes: Vec::new(),
        }
    }

    /// Current time according to the store's clock (Unix ms)
    pub fn now(&self) -> u64 {
        self.clock.now_millis()
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Drop the entry if its deadline has passed; true when it was dropped
    fn evict_if_expired(&mut self, key: &Bytes) -> bool {
        let now = self.now();
        let expired = self
            .store
            .get(key)
            .map(|entry| entry.is_expired(now))
            .unwrap_or(false);
        if expired {
            self.remove_entry(key);
        }
        expired
    }

    fn remove_entry(&mut self, key: &Bytes) -> Option<Entry> {
        let entry = self.store.remove(key)?;
        self.cancel_deadline(&entry);
        Some(entry)
    }

    fn cancel_deadline(&mut self, entry: &Entry) {
        if entry.expire_at.is_some() {
            self.timer_changes.push(TimerChange::Cancel(entry.key.clone()));
        }
    }

    /// Value stored at `key`, unless missing or expired
    pub fn get(&mut self, key: &Bytes) -> Option<&Value> {
        self.evict_if_expired(key);
        self.store.get(key).map(|entry| &entry.value)
    }

    /// Mutable access to a live value
    pub fn get_mut(&mut self, key: &Bytes) -> Option<&mut Value> {
        self.evict_if_expired(key);
        self.store.get_mut(key).map(|entry| {
            entry.touch();
            &mut entry.value
        })
    }

    /// Mutable access to the value at `key`, creating it with `init` first
    /// when the key is missing or expired
    pub fn get_or_insert_with(&mut self, key: &Bytes, init: impl FnOnce() -> Value) -> &mut Value {
        self.evict_if_expired(key);
        let entry = self
            .store
            .entry(key.clone())
            .or_insert_with(|| Entry::new(key.clone(), init()));
        entry.touch();
        &mut entry.value
    }

    /// Store a value, replacing whatever was there (expiration included)
    pub fn insert(&mut self, key: impl Into<Bytes>, value: Value) -> bool {
        let key = key.into();
        let is_new = !self.exists(&key);
        if let Some(old) = self.store.insert(key.clone(), Entry::new(key, value)) {
            self.cancel_deadline(&old);
        }
        is_new
    }

    /// Remove a collection that became empty after a mutation
    pub fn remove_if_vacant(&mut self, key: &Bytes) {
        let vacant = self
            .store
            .get(key)
            .map(|entry| entry.value.is_vacant())
            .unwrap_or(false);
        if vacant {
            self.remove_entry(key);
        }
    }

    /// Delete a key; true when a live key was removed
    pub fn delete(&mut self, key: &Bytes) -> bool {
        if self.evict_if_expired(key) {
            return false;
        }
        self.remove_entry(key).is_some()
    }

    pub fn exists(&mut self, key: &Bytes) -> bool {
        self.evict_if_expired(key);
        self.store.contains_key(key)
    }

    /// Set an absolute expiration (Unix ms)
    ///
    /// Objects also receive the `expireAt` field. A missing key becomes an
    /// object holding only that field.
    pub fn set_expire_at(&mut self, key: &Bytes, at_millis: u64) {
        let value = self.get_or_insert_with(key, Value::empty_hash);
        if let Some(hash) = value.as_hash_mut() {
            hash.insert(
                Bytes::from_static(EXPIRE_AT_FIELD.as_bytes()),
                Bytes::from(at_millis.to_string()),
            );
        }
        if let Some(entry) = self.store.get_mut(key) {
            entry.expire_at = Some(at_millis);
        }
        self.timer_changes
            .push(TimerChange::Schedule(key.clone(), at_millis));
    }

    /// Remaining TTL in milliseconds: `-1` without expiration, `-2` when missing
    pub fn pttl(&mut self, key: &Bytes) -> i64 {
        self.evict_if_expired(key);
        let now = self.now();
        self.store.get(key).map(|entry| entry.pttl(now)).unwrap_or(-2)
    }

    /// Raw entry access, expiration metadata included
    pub fn entry(&mut self, key: &Bytes) -> Option<&Entry> {
        self.evict_if_expired(key);
        self.store.get(key)
    }

    /// Remove and return a live entry
    pub fn take(&mut self, key: &Bytes) -> Option<Entry> {
        if self.evict_if_expired(key) {
            return None;
        }
        self.remove_entry(key)
    }

    /// Move `old` to `new`, replacing `new`; false when `old` is missing
    pub fn rename(&mut self, old: &Bytes, new: &Bytes) -> bool {
        let Some(mut entry) = self.take(old) else {
            return false;
        };
        entry.key = new.clone();
        entry.touch();
        self.remove_entry(new);
        if let Some(at) = entry.expire_at {
            self.timer_changes.push(TimerChange::Schedule(new.clone(), at));
        }
        self.store.insert(new.clone(), entry);
        true
    }

    /// Drop every key and every search index
    pub fn clear(&mut self) {
        self.store.clear();
        self.search.clear();
        self.timer_changes.clear();
        self.timer_changes.push(TimerChange::CancelAll);
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = self.now();
        self.store.values().filter(|entry| !entry.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All live keys (expensive, for admin use)
    pub fn keys(&self) -> Vec<Bytes> {
        let now = self.now();
        self.store
            .values()
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.key.clone())
            .collect()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.now();
        let expired: Vec<Bytes> = self
            .store
            .values()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.key.clone())
            .collect();
        for key in &expired {
            self.remove_entry(key);
        }
        expired.len()
    }

    /// Drop `key` if its current deadline has passed
    ///
    /// Timer queues call this when a scheduled deadline fires; the deadline
    /// may have been moved since it was scheduled.
    pub fn expire_if_due(&mut self, key: &Bytes) -> bool {
        self.evict_if_expired(key)
    }

    /// Deadline changes since the previous call, for timer-driven expiry
    pub fn take_timer_changes(&mut self) -> Vec<TimerChange> {
        std::mem::take(&mut self.timer_changes)
    }

    /// Search index for `namespace`, created on demand
    pub fn search_index_mut(&mut self, namespace: &Bytes) -> &mut SearchIndex {
        self.search.entry(namespace.clone()).or_default()
    }

    pub fn search_index(&self, namespace: &Bytes) -> Option<&SearchIndex> {
        self.search.get(namespace)
    }

    /// Forget a namespace that no longer holds documents
    pub fn drop_search_index_if_empty(&mut self, namespace: &Bytes) {
        if self.search.get(namespace).map(SearchIndex::is_empty).unwrap_or(false) {
            self.search.remove(namespace);
        }
    }

    /// Approximate memory held by live keys
    pub fn memory_usage(&self) -> usize {
        let now = self.now();
        self.store
            .values()
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.memory_usage())
            .sum()
    }

    pub fn stats(&self) -> StoreStats {
        let now = self.now();
        let active_keys = self.store.values().filter(|entry| !entry.is_expired(now)).count();
        let volatile_keys = self
            .store
            .values()
            .filter(|entry| entry.expire_at.is_some() && !entry.is_expired(now))
            .count();

        StoreStats {
            total_keys: self.store.len(),
            expired_keys: self.store.len() - active_keys,
            active_keys,
            volatile_keys,
            used_memory_bytes: self.memory_usage(),
            index_memory_bytes: self.search.values().map(SearchIndex::memory_usage).sum(),
            search_documents: self.search.values().map(SearchIndex::len).sum(),
            search_namespaces: self.search.len(),
            aof_bytes: 0,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Figures reported by `INFO` and the operations endpoint
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct StoreStats {
    /// Entries in the map, expired ones not yet swept included
    pub total_keys: usize,
    pub expired_keys: usize,
    pub active_keys: usize,
    /// Live keys carrying an expiration
    pub volatile_keys: usize,
    pub used_memory_bytes: usize,
    pub index_memory_bytes: usize,
    pub search_documents: usize,
    pub search_namespaces: usize,
    /// Size of the append-only file; zero without persistence
    pub aof_bytes: u64,
}

impl StoreStats {
    /// Sum the figures of several keyspaces
    pub fn merge(mut self, other: &StoreStats) -> StoreStats {
        self.total_keys += other.total_keys;
        self.expired_keys += other.expired_keys;
        self.active_keys += other.active_keys;
        self.volatile_keys += other.volatile_keys;
        self.used_memory_bytes += other.used_memory_bytes;
        self.index_memory_bytes += other.index_memory_bytes;
        self.search_documents += other.search_documents;
        self.search_namespaces += other.search_namespaces;
        self.aof_bytes += other.aof_bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::VALUE_FIELD;
    use std::sync::Arc;

    fn key(s: &'static str) -> Bytes {
        Bytes::from(s)
    }

    fn object(field: &'static str, value: &'static str) -> Value {
        let mut v = Value::empty_hash();
        if let Some(hash) = v.as_hash_mut() {
            hash.insert(Bytes::from(field), Bytes::from(value));
        }
        v
    }

    #[test]
    fn test_insert_get_delete() {
        let mut store = MemoryStore::new();
        assert!(store.insert("user:1", object(VALUE_FIELD, "alice")));
        assert!(!store.insert("user:1", object(VALUE_FIELD, "bob")));

        let value = store.get(&key("user:1")).unwrap();
        assert_eq!(value.as_hash().unwrap().get(&key("value")), Some(&key("bob")));

        assert!(store.delete(&key("user:1")));
        assert!(!store.delete(&key("user:1")));
        assert!(!store.exists(&key("user:1")));
    }

    #[test]
    fn test_expiration_follows_the_clock() {
        let clock = Arc::new(ManualClock::new(10_000));
        let mut store = MemoryStore::with_clock(clock.clone());
        store.insert("session", object("uid", "1"));
        store.set_expire_at(&key("session"), 11_000);

        let hash = store.get(&key("session")).unwrap().as_hash().unwrap();
        assert_eq!(hash.get(&key(EXPIRE_AT_FIELD)), Some(&key("11000")));
        assert_eq!(store.pttl(&key("session")), 1_000);

        clock.advance(1_000);
        assert!(!store.exists(&key("session")));
        assert_eq!(store.pttl(&key("session")), -2);
    }

    #[test]
    fn test_expiring_missing_key_creates_object() {
        let mut store = MemoryStore::with_clock(Arc::new(ManualClock::new(0)));
        store.set_expire_at(&key("ghost"), 500);
        let hash = store.get(&key("ghost")).unwrap().as_hash().unwrap();
        assert_eq!(hash.len(), 1);
        assert_eq!(
            store.take_timer_changes(),
            vec![TimerChange::Schedule(key("ghost"), 500)]
        );
        assert!(store.take_timer_changes().is_empty());
    }

    #[test]
    fn test_cleanup_expired() {
        let clock = Arc::new(ManualClock::new(0));
        let mut store = MemoryStore::with_clock(clock.clone());
        store.insert("a", Value::empty_hash());
        store.insert("b", Value::empty_hash());
        store.set_expire_at(&key("a"), 100);

        clock.advance(100);
        assert_eq!(store.stats().expired_keys, 1);
        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.keys(), vec![key("b")]);
    }

    #[test]
    fn test_rename_keeps_expiration() {
        let mut store = MemoryStore::with_clock(Arc::new(ManualClock::new(0)));
        store.insert("old", object("x", "1"));
        store.set_expire_at(&key("old"), 5_000);
        store.take_timer_changes();

        assert!(store.rename(&key("old"), &key("new")));
        assert!(!store.exists(&key("old")));
        assert_eq!(store.pttl(&key("new")), 5_000);
        assert_eq!(
            store.take_timer_changes(),
            vec![
                TimerChange::Cancel(key("old")),
                TimerChange::Schedule(key("new"), 5_000)
            ]
        );
        assert!(!store.rename(&key("missing"), &key("other")));
    }

    #[test]
    fn test_vacant_collections_are_removed() {
        let mut store = MemoryStore::new();
        store.insert("tags", Value::empty_set());
        store.insert("user:1", Value::empty_hash());
        store.remove_if_vacant(&key("tags"));
        store.remove_if_vacant(&key("user:1"));
        assert!(!store.exists(&key("tags")));
        assert!(store.exists(&key("user:1")));
    }

    #[test]
    fn test_clear_drops_search_indexes() {
        let mut store = MemoryStore::new();
        store
            .search_index_mut(&key("posts"))
            .upsert(key("1"), "hello".to_string());
        assert_eq!(store.stats().search_documents, 1);
        store.clear();
        assert!(store.search_index(&key("posts")).is_none());
    }
}

//! Keyspace entries

use super::value::Value;
use bytes::Bytes;

/// One key with its value and optional absolute expiration
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: Bytes,

    pub value: Value,

    /// Expiration as Unix milliseconds
    pub expire_at: Option<u64>,

    /// Bumped on every write through the store
    pub version: u64,
}

impl Entry {
    pub fn new(key: impl Into<Bytes>, value: Value) -> Self {
        Entry {
            key: key.into(),
            value,
            expire_at: None,
            version: 0,
        }
    }

    /// An entry is expired from its deadline onwards
    pub fn is_expired(&self, now_millis: u64) -> bool {
        matches!(self.expire_at, Some(at) if now_millis >= at)
    }

    /// Remaining time to live in milliseconds
    ///
    /// `-1` when the entry never expires, `-2` once it has expired.
    pub fn pttl(&self, now_millis: u64) -> i64 {
        match self.expire_at {
            Some(at) if at > now_millis => (at - now_millis) as i64,
            Some(_) => -2,
            None => -1,
        }
    }

    pub fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Approximate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        let metadata = std::mem::size_of::<Option<u64>>() + std::mem::size_of::<u64>();
        self.key.len() + self.value.memory_usage() + metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiration_boundary() {
        let mut entry = Entry::new("k", Value::empty_hash());
        assert!(!entry.is_expired(u64::MAX));
        assert_eq!(entry.pttl(0), -1);

        entry.expire_at = Some(1_000);
        assert!(!entry.is_expired(999));
        assert!(entry.is_expired(1_000));
        assert_eq!(entry.pttl(400), 600);
        assert_eq!(entry.pttl(1_000), -2);
    }
}

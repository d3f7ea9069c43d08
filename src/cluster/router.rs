//! Key routing
//!
//! Keys map to shards by SipHash-1-3 modulo the shard count.

use bytes::Bytes;
use siphasher::sip::SipHasher13;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct ShardRouter {
    num_shards: usize,
}

impl ShardRouter {
    /// A router over `num_shards` shards (at least one)
    pub fn new(num_shards: usize) -> Self {
        ShardRouter {
            num_shards: num_shards.max(1),
        }
    }

    pub fn route_key(&self, key: &[u8]) -> usize {
        let mut hasher = SipHasher13::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.num_shards
    }

    /// Group keys by owning shard; index `i` holds the keys of shard `i`
    pub fn split(&self, keys: &[Bytes]) -> Vec<Vec<Bytes>> {
        let mut groups = vec![Vec::new(); self.num_shards];
        for key in keys {
            groups[self.route_key(key)].push(key.clone());
        }
        groups
    }

    pub fn num_shards(&self) -> usize {
        self.num_shards
    }
}

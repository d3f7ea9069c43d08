//! Value types held by the keyspace

use super::zset::SortedSet;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};

/// Field map of an object
pub type ObjectMap = HashMap<Bytes, Bytes>;

/// The kinds of value a key can hold
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Object: field -> value
    Hash(ObjectMap),

    /// Members ordered by score
    SortedSet(SortedSet),

    /// Unique, unordered members
    Set(HashSet<Bytes>),

    /// Ordered sequence
    List(VecDeque<Bytes>),
}

impl Value {
    pub fn empty_hash() -> Self {
        Value::Hash(HashMap::new())
    }

    pub fn empty_sorted_set() -> Self {
        Value::SortedSet(SortedSet::new())
    }

    pub fn empty_set() -> Self {
        Value::Set(HashSet::new())
    }

    pub fn empty_list() -> Self {
        Value::List(VecDeque::new())
    }

    /// Type name as reported by `TYPE`
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Hash(_) => "hash",
            Value::SortedSet(_) => "zset",
            Value::Set(_) => "set",
            Value::List(_) => "list",
        }
    }

    /// Collections vanish once empty; objects stay (an object with no
    /// fields still exists)
    pub fn is_vacant(&self) -> bool {
        match self {
            Value::Hash(_) => false,
            Value::SortedSet(z) => z.is_empty(),
            Value::Set(s) => s.is_empty(),
            Value::List(l) => l.is_empty(),
        }
    }

    pub fn as_hash(&self) -> Option<&ObjectMap> {
        match self {
            Value::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    pub fn as_hash_mut(&mut self) -> Option<&mut ObjectMap> {
        match self {
            Value::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    pub fn as_sorted_set(&self) -> Option<&SortedSet> {
        match self {
            Value::SortedSet(zset) => Some(zset),
            _ => None,
        }
    }

    pub fn as_sorted_set_mut(&mut self) -> Option<&mut SortedSet> {
        match self {
            Value::SortedSet(zset) => Some(zset),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&HashSet<Bytes>> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut HashSet<Bytes>> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&VecDeque<Bytes>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut VecDeque<Bytes>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Approximate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        match self {
            Value::Hash(hash) => {
                let items: usize = hash.iter().map(|(k, v)| k.len() + v.len()).sum();
                items + std::mem::size_of::<ObjectMap>()
            }
            Value::SortedSet(zset) => zset.memory_usage(),
            Value::Set(set) => {
                let items: usize = set.iter().map(|b| b.len()).sum();
                items + std::mem::size_of::<HashSet<Bytes>>()
            }
            Value::List(list) => {
                let items: usize = list.iter().map(|b| b.len()).sum();
                items + std::mem::size_of::<VecDeque<Bytes>>()
            }
        }
    }
}

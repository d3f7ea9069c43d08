//! Command execution context

use super::CommandError;
use crate::aof::{AofEntry, AofOperation, AofWriter};
use crate::clock::SharedClock;
use crate::store::{MemoryStore, ObjectMap, SortedSet, StoreStats, Value};
use bytes::Bytes;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::error;

/// Everything a command may touch: the keyspace and the optional log
pub struct CommandContext {
    pub store: MemoryStore,

    /// Mutations are appended here when persistence is on
    pub aof_writer: Option<Arc<AofWriter>>,
}

impl CommandContext {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_store(MemoryStore::with_capacity(capacity))
    }

    pub fn with_clock(capacity: usize, clock: SharedClock) -> Self {
        Self::with_store(MemoryStore::with_capacity_and_clock(capacity, clock))
    }

    pub fn with_store(store: MemoryStore) -> Self {
        CommandContext {
            store,
            aof_writer: None,
        }
    }

    pub fn set_aof_writer(&mut self, writer: Arc<AofWriter>) {
        self.aof_writer = Some(writer);
    }

    /// Append a mutation to the log, if one is attached
    ///
    /// A failed write is logged and otherwise ignored; the in-memory state
    /// is already updated.
    pub fn log(&self, op: AofOperation, key: Bytes, payload: Vec<Bytes>) {
        if let Some(writer) = &self.aof_writer {
            if let Err(e) = writer.write(&AofEntry::new(op, key, payload)) {
                error!("Failed to append {:?} to AOF: {}", op, e);
            }
        }
    }

    /// Keyspace figures plus the size of the attached log
    pub fn stats(&self) -> StoreStats {
        let mut stats = self.store.stats();
        if let Some(writer) = &self.aof_writer {
            match writer.file_size() {
                Ok(size) => stats.aof_bytes = size,
                Err(e) => error!("Failed to read AOF size: {}", e),
            }
        }
        stats
    }

    pub fn hash(&mut self, key: &Bytes) -> Result<Option<&ObjectMap>, CommandError> {
        match self.store.get(key) {
            Some(value) => value.as_hash().map(Some).ok_or(CommandError::WrongType),
            None => Ok(None),
        }
    }

    pub fn hash_mut(&mut self, key: &Bytes) -> Result<Option<&mut ObjectMap>, CommandError> {
        match self.store.get_mut(key) {
            Some(value) => value.as_hash_mut().map(Some).ok_or(CommandError::WrongType),
            None => Ok(None),
        }
    }

    /// The object at `key`, created empty when missing
    pub fn hash_or_create(&mut self, key: &Bytes) -> Result<&mut ObjectMap, CommandError> {
        self.store
            .get_or_insert_with(key, Value::empty_hash)
            .as_hash_mut()
            .ok_or(CommandError::WrongType)
    }

    pub fn sorted_set(&mut self, key: &Bytes) -> Result<Option<&SortedSet>, CommandError> {
        match self.store.get(key) {
            Some(value) => value.as_sorted_set().map(Some).ok_or(CommandError::WrongType),
            None => Ok(None),
        }
    }

    pub fn sorted_set_mut(&mut self, key: &Bytes) -> Result<Option<&mut SortedSet>, CommandError> {
        match self.store.get_mut(key) {
            Some(value) => value.as_sorted_set_mut().map(Some).ok_or(CommandError::WrongType),
            None => Ok(None),
        }
    }

    pub fn sorted_set_or_create(&mut self, key: &Bytes) -> Result<&mut SortedSet, CommandError> {
        self.store
            .get_or_insert_with(key, Value::empty_sorted_set)
            .as_sorted_set_mut()
            .ok_or(CommandError::WrongType)
    }

    pub fn set(&mut self, key: &Bytes) -> Result<Option<&HashSet<Bytes>>, CommandError> {
        match self.store.get(key) {
            Some(value) => value.as_set().map(Some).ok_or(CommandError::WrongType),
            None => Ok(None),
        }
    }

    pub fn set_mut(&mut self, key: &Bytes) -> Result<Option<&mut HashSet<Bytes>>, CommandError> {
        match self.store.get_mut(key) {
            Some(value) => value.as_set_mut().map(Some).ok_or(CommandError::WrongType),
            None => Ok(None),
        }
    }

    pub fn set_or_create(&mut self, key: &Bytes) -> Result<&mut HashSet<Bytes>, CommandError> {
        self.store
            .get_or_insert_with(key, Value::empty_set)
            .as_set_mut()
            .ok_or(CommandError::WrongType)
    }

    pub fn list(&mut self, key: &Bytes) -> Result<Option<&VecDeque<Bytes>>, CommandError> {
        match self.store.get(key) {
            Some(value) => value.as_list().map(Some).ok_or(CommandError::WrongType),
            None => Ok(None),
        }
    }

    pub fn list_mut(&mut self, key: &Bytes) -> Result<Option<&mut VecDeque<Bytes>>, CommandError> {
        match self.store.get_mut(key) {
            Some(value) => value.as_list_mut().map(Some).ok_or(CommandError::WrongType),
            None => Ok(None),
        }
    }

    pub fn list_or_create(&mut self, key: &Bytes) -> Result<&mut VecDeque<Bytes>, CommandError> {
        self.store
            .get_or_insert_with(key, Value::empty_list)
            .as_list_mut()
            .ok_or(CommandError::WrongType)
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::new()
    }
}

//! In-memory storage
//!
//! Keyspace, value types, sorted sets and the search index. Independent of
//! the protocol and of command handling.

mod entry;
mod value;
mod memory;
pub mod zset;
pub mod search;

pub use entry::Entry;
pub use value::{ObjectMap, Value};
pub use memory::{MemoryStore, StoreStats, TimerChange};
pub use zset::{ScoreBound, SortedSet};
pub use search::SearchIndex;

/// Field written by the single-value wrappers (`SET`/`GET`/`INCR`)
pub const VALUE_FIELD: &str = "value";

/// Field carrying an object's absolute expiration, in Unix milliseconds
pub const EXPIRE_AT_FIELD: &str = "expireAt";

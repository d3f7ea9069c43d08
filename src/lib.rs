//! forumdb: the storage layer of a discussion forum
//!
//! Objects, sorted sets, sets and lists with field-level operations,
//! atomic counters, expiration and full-text search, behind one contract
//! ([`Database`]) served by an in-memory or a sharded backend.
//!
//! Layers, bottom-up:
//! - `store`: keyspace, typed values, TTL metadata, search index
//! - `commands` / `dispatch`: Redis-style commands over a store
//! - `aof`: append-only persistence and replay
//! - `cluster`: shard threads with per-shard timer queues
//! - `db`: backend selection and the typed async client
//! - `server` / `web`: RESP and JSON surfaces

pub mod aof;
pub mod cache;
pub mod clock;
pub mod cluster;
pub mod commands;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod protocol;
pub mod server;
pub mod store;
pub mod web;

pub use cache::TtlCache;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{BackendKind, Config};
pub use db::{Backend, Database, DbError, DbInfo, DbResult};
pub use protocol::Frame;

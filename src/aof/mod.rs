//! Append-only file persistence
//!
//! Every mutation is appended in a compact checksummed binary format and
//! replayed through the command registry at startup.

mod entry;
mod writer;
mod reader;
mod replay;

pub use entry::{AofEntry, AofOperation};
pub use writer::AofWriter;
pub use reader::AofReader;
pub use replay::{replay_entries, restore};

use serde::Deserialize;
use std::path::PathBuf;

/// AOF failures
#[derive(Debug, thiserror::Error)]
pub enum AofError {
    #[error("truncated entry")]
    Truncated,

    #[error("unknown operation type {0}")]
    UnknownOperation(u8),

    #[error("checksum mismatch: stored {stored:#x}, computed {computed:#x}")]
    ChecksumMismatch { stored: u64, computed: u64 },

    #[error("AOF I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AOF writer lock poisoned")]
    Poisoned,
}

/// When appended data is forced to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPolicy {
    /// After every write
    Always,
    /// At most once per second
    #[default]
    #[serde(alias = "everysecond")]
    EverySec,
    /// Left to the OS
    No,
}

/// Where and how one keyspace persists
#[derive(Debug, Clone)]
pub struct AofConfig {
    pub path: PathBuf,
    pub sync_policy: SyncPolicy,
    pub enabled: bool,
}

impl AofConfig {
    pub fn disabled() -> Self {
        AofConfig {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for AofConfig {
    fn default() -> Self {
        AofConfig {
            path: PathBuf::from("forumdb.aof"),
            sync_policy: SyncPolicy::default(),
            enabled: true,
        }
    }
}

//! Typed async client
//!
//! [`Database`] is the contract the forum talks to: objects, sorted sets,
//! sets, lists, expiration and search, served by whichever [`Backend`] the
//! configuration selects. Every call builds a command frame, runs it on the
//! backend and decodes the reply.
//!
//! An empty key is never an error: writes do nothing and reads return the
//! empty result.

mod backend;
mod info;
mod list;
mod object;
mod search;
mod set;
mod sorted_set;

pub use backend::Backend;
pub use info::DbInfo;
pub use object::Object;

use crate::aof::AofError;
use crate::clock::{self, SharedClock};
use crate::cluster::ClusterError;
use crate::config::{Config, ConfigError};
use crate::protocol::Frame;
use bytes::Bytes;
use std::future::Future;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Error reply from the store, text unchanged
    #[error("{0}")]
    Backend(String),

    #[error("backend unavailable: {0}")]
    Unavailable(#[from] ClusterError),

    #[error("unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: String, reply: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Aof(#[from] AofError),

    #[error("failed to start backend: {0}")]
    Startup(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Handle to the storage layer; cheap to clone
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

impl Database {
    /// Open the backend selected by `config`
    pub async fn open(config: &Config) -> DbResult<Self> {
        Self::open_with_clock(config, clock::system()).await
    }

    pub async fn open_with_clock(config: &Config, clock: SharedClock) -> DbResult<Self> {
        let backend = Backend::open(config, clock).await?;
        Ok(Database { backend })
    }

    pub fn from_backend(backend: Backend) -> Self {
        Database { backend }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Run a raw command frame; error replies are returned as frames
    pub async fn execute(&self, frame: Frame) -> DbResult<Frame> {
        self.backend.execute(frame).await
    }

    /// Run `name args...`, turning an error reply into [`DbError::Backend`]
    pub(crate) async fn call<I, B>(&self, name: &str, args: I) -> DbResult<Frame>
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        match self.backend.execute(Frame::command(name, args)).await? {
            Frame::Error(e) => Err(DbError::Backend(e)),
            reply => Ok(reply),
        }
    }

    /// Run an operation in the background, logging its failure
    ///
    /// For callers that do not wait on writes, such as view counters.
    pub fn detach<F, T>(operation: &'static str, fut: F)
    where
        F: Future<Output = DbResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(async move {
            if let Err(e) = fut.await {
                error!("Background {} failed: {}", operation, e);
            }
        });
    }
}

fn unexpected(command: &str, reply: &Frame) -> DbError {
    DbError::UnexpectedReply {
        command: command.to_string(),
        reply: reply.to_text(),
    }
}

fn lossy(bytes: &Bytes) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn integer_reply(command: &str, reply: Frame) -> DbResult<i64> {
    reply.as_integer().ok_or_else(|| unexpected(command, &reply))
}

fn ok_reply(command: &str, reply: Frame) -> DbResult<()> {
    match reply {
        Frame::Simple(_) => Ok(()),
        other => Err(unexpected(command, &other)),
    }
}

fn optional_string_reply(command: &str, reply: Frame) -> DbResult<Option<String>> {
    match reply {
        Frame::Bulk(bytes) => Ok(Some(lossy(&bytes))),
        Frame::Null => Ok(None),
        other => Err(unexpected(command, &other)),
    }
}

fn strings_reply(command: &str, reply: Frame) -> DbResult<Vec<String>> {
    match &reply {
        Frame::Array(items) => items
            .iter()
            .map(|item| item.as_bulk().map(lossy).ok_or_else(|| unexpected(command, &reply)))
            .collect(),
        _ => Err(unexpected(command, &reply)),
    }
}

fn optional_strings_reply(command: &str, reply: Frame) -> DbResult<Vec<Option<String>>> {
    match reply {
        Frame::Array(items) => items
            .into_iter()
            .map(|item| optional_string_reply(command, item))
            .collect(),
        other => Err(unexpected(command, &other)),
    }
}

/// Consecutive pairs of a flat array reply
fn pairs_reply(command: &str, reply: Frame) -> DbResult<Vec<(String, String)>> {
    let flat = strings_reply(command, reply)?;
    if flat.len() % 2 != 0 {
        return Err(DbError::UnexpectedReply {
            command: command.to_string(),
            reply: format!("odd number of elements ({})", flat.len()),
        });
    }
    let mut iter = flat.into_iter();
    let mut pairs = Vec::new();
    while let (Some(a), Some(b)) = (iter.next(), iter.next()) {
        pairs.push((a, b));
    }
    Ok(pairs)
}

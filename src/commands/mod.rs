//! Command layer
//!
//! Every command implements [`Command`]; families live in their own files
//! and are collected by the [`CommandRegistry`].

mod context;
mod registry;

mod key;
mod ttl;
mod value;
mod counter;
mod hash;
mod sorted_set;
mod set;
mod list;
mod search;
mod admin;

pub use admin::format_info;
pub use context::CommandContext;
pub use registry::CommandRegistry;

use crate::protocol::Frame;
use crate::store::{zset, ScoreBound};
use bytes::Bytes;

/// Command failures, turned into error replies by the registry
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    #[error("ERR value is not a valid float")]
    NotFloat,

    #[error("ERR min or max is not a float")]
    InvalidBound,

    #[error("ERR increment or decrement would overflow")]
    Overflow,

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR unknown command '{0}'")]
    Unknown(String),

    #[error("ERR {0}")]
    Invalid(String),
}

impl From<CommandError> for Frame {
    fn from(err: CommandError) -> Self {
        Frame::Error(err.to_string())
    }
}

pub type CommandResult = Result<Frame, CommandError>;

/// A single command
pub trait Command: Send + Sync {
    /// Run against the context; `args` excludes the command name
    fn execute(&self, ctx: &mut CommandContext, args: &[Frame]) -> CommandResult;

    fn name(&self) -> &'static str;

    fn min_args(&self) -> usize {
        0
    }

    /// `None` means unbounded
    fn max_args(&self) -> Option<usize> {
        None
    }
}

/// Argument `i` as raw bytes
pub(crate) fn arg(args: &[Frame], i: usize) -> Result<&Bytes, CommandError> {
    args.get(i)
        .and_then(Frame::as_bulk)
        .ok_or_else(|| CommandError::Invalid("expected bulk string argument".to_string()))
}

/// Argument `i` as UTF-8 text
pub(crate) fn arg_str(args: &[Frame], i: usize) -> Result<&str, CommandError> {
    std::str::from_utf8(arg(args, i)?)
        .map_err(|_| CommandError::Invalid("argument is not valid UTF-8".to_string()))
}

/// Argument `i` as a signed integer
pub(crate) fn arg_integer(args: &[Frame], i: usize) -> Result<i64, CommandError> {
    match args.get(i) {
        Some(Frame::Integer(n)) => Ok(*n),
        Some(Frame::Bulk(bytes)) => parse_integer(bytes),
        _ => Err(CommandError::NotInteger),
    }
}

/// Argument `i` as a score
pub(crate) fn arg_score(args: &[Frame], i: usize) -> Result<f64, CommandError> {
    zset::parse_score(arg(args, i)?).ok_or(CommandError::NotFloat)
}

/// Argument `i` as a score interval bound
pub(crate) fn arg_bound(args: &[Frame], i: usize) -> Result<ScoreBound, CommandError> {
    ScoreBound::parse(arg(args, i)?).ok_or(CommandError::InvalidBound)
}

/// Case-insensitive keyword check for argument `i`
pub(crate) fn arg_is(args: &[Frame], i: usize, keyword: &str) -> bool {
    arg(args, i)
        .map(|b| b.eq_ignore_ascii_case(keyword.as_bytes()))
        .unwrap_or(false)
}

pub(crate) fn parse_integer(bytes: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(CommandError::NotInteger)
}

/// Member/score pairs as a flat reply, optionally with scores
pub(crate) fn scored_reply(items: Vec<(Bytes, f64)>, with_scores: bool) -> Frame {
    let mut out = Vec::with_capacity(items.len() * if with_scores { 2 } else { 1 });
    for (member, score) in items {
        out.push(Frame::Bulk(member));
        if with_scores {
            out.push(Frame::bulk(zset::format_score(score)));
        }
    }
    Frame::Array(out)
}

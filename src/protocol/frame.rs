//! RESP2 frames

use bytes::Bytes;
use std::fmt;

/// A single RESP2 frame, used both for commands and for replies
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// `+OK\r\n`
    Simple(String),

    /// `-ERR message\r\n`
    Error(String),

    /// `:1000\r\n`
    Integer(i64),

    /// `$6\r\nfoobar\r\n`
    Bulk(Bytes),

    /// `$-1\r\n` (also produced for `*-1\r\n`)
    Null,

    /// `*2\r\n...`
    Array(Vec<Frame>),
}

impl Frame {
    pub fn ok() -> Self {
        Frame::Simple("OK".to_string())
    }

    pub fn simple(s: impl Into<String>) -> Self {
        Frame::Simple(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        Frame::Error(s.into())
    }

    /// The reply every command gives when a key holds another kind of value
    pub fn wrong_type() -> Self {
        Frame::Error("WRONGTYPE Operation against a key holding the wrong kind of value".to_string())
    }

    pub fn integer(i: i64) -> Self {
        Frame::Integer(i)
    }

    pub fn bulk(b: impl Into<Bytes>) -> Self {
        Frame::Bulk(b.into())
    }

    pub fn array(items: Vec<Frame>) -> Self {
        Frame::Array(items)
    }

    /// Build an array of bulk strings
    pub fn bulk_array<I, B>(items: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Frame::Array(items.into_iter().map(|b| Frame::Bulk(b.into())).collect())
    }

    /// Build a command frame from its name and arguments
    pub fn command<I, B>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut parts = vec![Frame::Bulk(Bytes::copy_from_slice(name.as_bytes()))];
        parts.extend(args.into_iter().map(|b| Frame::Bulk(b.into())));
        Frame::Array(parts)
    }

    pub fn as_bulk(&self) -> Option<&Bytes> {
        match self {
            Frame::Bulk(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Frame]> {
        match self {
            Frame::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Frame::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }

    /// Upper-cased command name when this frame is a command array
    pub fn command_name(&self) -> Option<String> {
        let first = self.as_array()?.first()?.as_bulk()?;
        std::str::from_utf8(first).ok().map(|s| s.to_ascii_uppercase())
    }

    /// Human readable rendering, numbered like redis-cli
    pub fn to_text(&self) -> String {
        match self {
            Frame::Simple(s) => s.clone(),
            Frame::Error(e) => format!("(error) {}", e),
            Frame::Integer(i) => format!("(integer) {}", i),
            Frame::Bulk(bytes) => format!("\"{}\"", String::from_utf8_lossy(bytes)),
            Frame::Null => "(nil)".to_string(),
            Frame::Array(items) if items.is_empty() => "(empty array)".to_string(),
            Frame::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{}) {}", i + 1, item.to_text()))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "Simple({})", s),
            Frame::Error(e) => write!(f, "Error({})", e),
            Frame::Integer(i) => write!(f, "Integer({})", i),
            Frame::Bulk(b) => write!(f, "Bulk({} bytes)", b.len()),
            Frame::Null => write!(f, "Null"),
            Frame::Array(items) => write!(f, "Array({} elements)", items.len()),
        }
    }
}

/// Decoding failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    /// Not enough bytes buffered yet
    #[error("incomplete frame")]
    Incomplete,

    #[error("invalid protocol: {0}")]
    Invalid(String),

    #[error("invalid UTF-8")]
    InvalidUtf8,

    #[error("invalid integer")]
    InvalidInteger,
}

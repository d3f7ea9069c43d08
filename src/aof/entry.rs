//! AOF entry format
//!
//! `[op u8][timestamp u64][key_len u32][key][count u32]([len u32][bytes])*[xxh64 u64]`,
//! integers little endian, checksum over everything before it.

use super::AofError;
use bytes::{Buf, BufMut, Bytes};
use std::time::{SystemTime, UNIX_EPOCH};

/// Logged mutation kinds
///
/// Every operation replays as the command of the same name, with the key
/// followed by the payload as arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AofOperation {
    Del = 2,
    PExpireAt = 3,
    HSet = 4,
    HDel = 5,
    LPush = 6,
    RPush = 7,
    SAdd = 8,
    ZAdd = 9,
    ZRem = 10,
    SRem = 11,
    RPop = 12,
    LRem = 13,
    LTrim = 14,
    Rename = 15,
    SearchIndex = 16,
    SearchRemove = 17,
    FlushDb = 18,
}

impl AofOperation {
    pub fn from_u8(value: u8) -> Option<Self> {
        use AofOperation::*;
        let op = match value {
            2 => Del,
            3 => PExpireAt,
            4 => HSet,
            5 => HDel,
            6 => LPush,
            7 => RPush,
            8 => SAdd,
            9 => ZAdd,
            10 => ZRem,
            11 => SRem,
            12 => RPop,
            13 => LRem,
            14 => LTrim,
            15 => Rename,
            16 => SearchIndex,
            17 => SearchRemove,
            18 => FlushDb,
            _ => return None,
        };
        Some(op)
    }

    /// Command executed when the entry is replayed
    pub fn command_name(&self) -> &'static str {
        use AofOperation::*;
        match self {
            Del => "DEL",
            PExpireAt => "PEXPIREAT",
            HSet => "HSET",
            HDel => "HDEL",
            LPush => "LPUSH",
            RPush => "RPUSH",
            SAdd => "SADD",
            ZAdd => "ZADD",
            ZRem => "ZREM",
            SRem => "SREM",
            RPop => "RPOP",
            LRem => "LREM",
            LTrim => "LTRIM",
            Rename => "RENAME",
            SearchIndex => "SEARCHINDEX",
            SearchRemove => "SEARCHREMOVE",
            FlushDb => "FLUSHDB",
        }
    }
}

/// One logged mutation
#[derive(Debug, Clone, PartialEq)]
pub struct AofEntry {
    pub op: AofOperation,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub key: Bytes,
    pub payload: Vec<Bytes>,
}

impl AofEntry {
    pub fn new(op: AofOperation, key: Bytes, payload: Vec<Bytes>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        AofEntry {
            op,
            timestamp,
            key,
            payload,
        }
    }

    /// Arguments of the replayed command
    pub fn command_args(&self) -> Vec<Bytes> {
        if self.op == AofOperation::FlushDb {
            return Vec::new();
        }
        let mut args = Vec::with_capacity(self.payload.len() + 1);
        args.push(self.key.clone());
        args.extend(self.payload.iter().cloned());
        args
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let payload_len: usize = self.payload.iter().map(|p| p.len() + 4).sum();
        let mut buf = Vec::with_capacity(1 + 8 + 4 + self.key.len() + 4 + payload_len + 8);

        buf.put_u8(self.op as u8);
        buf.put_u64_le(self.timestamp);
        buf.put_u32_le(self.key.len() as u32);
        buf.put_slice(&self.key);
        buf.put_u32_le(self.payload.len() as u32);
        for item in &self.payload {
            buf.put_u32_le(item.len() as u32);
            buf.put_slice(item);
        }

        let checksum = xxhash_rust::xxh64::xxh64(&buf, 0);
        buf.put_u64_le(checksum);
        buf
    }

    /// Decode one entry from the front of `data`, returning it with the
    /// number of bytes it occupied
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), AofError> {
        let mut cursor = data;

        let op_byte = take_u8(&mut cursor)?;
        let op = AofOperation::from_u8(op_byte).ok_or(AofError::UnknownOperation(op_byte))?;
        let timestamp = take_u64(&mut cursor)?;
        let key = take_chunk(&mut cursor)?;

        let count = take_u32(&mut cursor)? as usize;
        let mut payload = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            payload.push(take_chunk(&mut cursor)?);
        }

        let body_len = data.len() - cursor.len();
        let stored = take_u64(&mut cursor)?;
        let computed = xxhash_rust::xxh64::xxh64(&data[..body_len], 0);
        if stored != computed {
            return Err(AofError::ChecksumMismatch { stored, computed });
        }

        Ok((
            AofEntry {
                op,
                timestamp,
                key,
                payload,
            },
            body_len + 8,
        ))
    }
}

fn take_u8(cursor: &mut &[u8]) -> Result<u8, AofError> {
    if cursor.remaining() < 1 {
        return Err(AofError::Truncated);
    }
    Ok(cursor.get_u8())
}

fn take_u32(cursor: &mut &[u8]) -> Result<u32, AofError> {
    if cursor.remaining() < 4 {
        return Err(AofError::Truncated);
    }
    Ok(cursor.get_u32_le())
}

fn take_u64(cursor: &mut &[u8]) -> Result<u64, AofError> {
    if cursor.remaining() < 8 {
        return Err(AofError::Truncated);
    }
    Ok(cursor.get_u64_le())
}

fn take_chunk(cursor: &mut &[u8]) -> Result<Bytes, AofError> {
    let len = take_u32(cursor)? as usize;
    if cursor.remaining() < len {
        return Err(AofError::Truncated);
    }
    Ok(cursor.copy_to_bytes(len))
}

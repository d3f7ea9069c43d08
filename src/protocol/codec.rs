//! RESP2 decoding and encoding
//!
//! Decoding walks a cursor over the buffered bytes and only consumes them
//! once a whole frame is available, so a frame split across reads is never
//! half-consumed.

use super::frame::{Frame, FrameError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

const CRLF: &[u8] = b"\r\n";

/// Largest bulk string accepted from a client
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Largest element count accepted for one array
pub const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// Deepest array nesting accepted
const MAX_DEPTH: usize = 32;

/// Decode one frame from the front of `buf`
///
/// Returns `Ok(None)` when more bytes are needed; nothing is consumed in
/// that case.
pub fn decode(buf: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
    if buf.is_empty() {
        return Ok(None);
    }

    let mut cursor = Cursor::new(&buf[..]);
    match parse(&mut cursor, 0) {
        Ok(frame) => {
            let consumed = cursor.position() as usize;
            buf.advance(consumed);
            Ok(Some(frame))
        }
        Err(FrameError::Incomplete) => Ok(None),
        Err(e) => Err(e),
    }
}

fn parse(cursor: &mut Cursor<&[u8]>, depth: usize) -> Result<Frame, FrameError> {
    if depth > MAX_DEPTH {
        return Err(FrameError::Invalid("arrays nested too deeply".to_string()));
    }
    if !cursor.has_remaining() {
        return Err(FrameError::Incomplete);
    }

    match cursor.get_u8() {
        b'+' => Ok(Frame::Simple(line_string(cursor)?)),
        b'-' => Ok(Frame::Error(line_string(cursor)?)),
        b':' => Ok(Frame::Integer(line_integer(cursor)?)),
        b'$' => {
            let len = line_integer(cursor)?;
            if len == -1 {
                return Ok(Frame::Null);
            }
            if !(0..=MAX_BULK_LEN).contains(&len) {
                return Err(FrameError::Invalid(format!("bulk length {}", len)));
            }
            let len = len as usize;
            if cursor.remaining() < len + 2 {
                return Err(FrameError::Incomplete);
            }
            let start = cursor.position() as usize;
            let data = Bytes::copy_from_slice(&cursor.get_ref()[start..start + len]);
            cursor.advance(len);
            if &cursor.chunk()[..2] != CRLF {
                return Err(FrameError::Invalid("missing CRLF after bulk string".to_string()));
            }
            cursor.advance(2);
            Ok(Frame::Bulk(data))
        }
        b'*' => {
            let count = line_integer(cursor)?;
            if count == -1 {
                return Ok(Frame::Null);
            }
            if !(0..=MAX_ARRAY_LEN).contains(&count) {
                return Err(FrameError::Invalid(format!("array length {}", count)));
            }
            // Every element takes at least three bytes
            let mut items = Vec::with_capacity((count as usize).min(cursor.remaining() / 3));
            for _ in 0..count {
                items.push(parse(cursor, depth + 1)?);
            }
            Ok(Frame::Array(items))
        }
        other => Err(FrameError::Invalid(format!("unknown type prefix: {}", other as char))),
    }
}

/// Read up to the next CRLF and consume it
fn line<'a>(cursor: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], FrameError> {
    let start = cursor.position() as usize;
    let data: &'a [u8] = *cursor.get_ref();
    let end = data[start..]
        .windows(2)
        .position(|w| w == CRLF)
        .ok_or(FrameError::Incomplete)?;
    cursor.set_position((start + end + 2) as u64);
    Ok(&data[start..start + end])
}

fn line_string(cursor: &mut Cursor<&[u8]>) -> Result<String, FrameError> {
    let raw = line(cursor)?;
    String::from_utf8(raw.to_vec()).map_err(|_| FrameError::InvalidUtf8)
}

fn line_integer(cursor: &mut Cursor<&[u8]>) -> Result<i64, FrameError> {
    let raw = line(cursor)?;
    std::str::from_utf8(raw)
        .map_err(|_| FrameError::InvalidUtf8)?
        .parse::<i64>()
        .map_err(|_| FrameError::InvalidInteger)
}

/// Encode a frame into a fresh buffer
pub fn encode(frame: &Frame) -> Bytes {
    let mut buf = BytesMut::new();
    encode_to(&mut buf, frame);
    buf.freeze()
}

/// Encode a frame at the end of `buf`
pub fn encode_to(buf: &mut BytesMut, frame: &Frame) {
    match frame {
        Frame::Simple(s) => {
            buf.put_u8(b'+');
            buf.put_slice(s.as_bytes());
            buf.put_slice(CRLF);
        }
        Frame::Error(e) => {
            buf.put_u8(b'-');
            buf.put_slice(e.as_bytes());
            buf.put_slice(CRLF);
        }
        Frame::Integer(i) => {
            buf.put_u8(b':');
            buf.put_slice(i.to_string().as_bytes());
            buf.put_slice(CRLF);
        }
        Frame::Bulk(bytes) => {
            buf.put_u8(b'$');
            buf.put_slice(bytes.len().to_string().as_bytes());
            buf.put_slice(CRLF);
            buf.put_slice(bytes);
            buf.put_slice(CRLF);
        }
        Frame::Null => buf.put_slice(b"$-1\r\n"),
        Frame::Array(items) => {
            buf.put_u8(b'*');
            buf.put_slice(items.len().to_string().as_bytes());
            buf.put_slice(CRLF);
            for item in items {
                encode_to(buf, item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scalars() {
        let mut buf = BytesMut::from("+OK\r\n-ERR boom\r\n:42\r\n$-1\r\n");
        assert_eq!(decode(&mut buf).unwrap(), Some(Frame::simple("OK")));
        assert_eq!(decode(&mut buf).unwrap(), Some(Frame::error("ERR boom")));
        assert_eq!(decode(&mut buf).unwrap(), Some(Frame::integer(42)));
        assert_eq!(decode(&mut buf).unwrap(), Some(Frame::Null));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_command_array() {
        let mut buf = BytesMut::from("*3\r\n$4\r\nZADD\r\n$1\r\nk\r\n$2\r\n10\r\n");
        let frame = decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, Frame::command("ZADD", ["k", "10"]));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_is_not_consumed() {
        let mut buf = BytesMut::from("*2\r\n$3\r\nGET\r\n$5\r\nhel");
        assert_eq!(decode(&mut buf).unwrap(), None);
        assert_eq!(buf.len(), 20);

        buf.extend_from_slice(b"lo\r\n");
        let frame = decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, Frame::command("GET", ["hello"]));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_unknown_prefix() {
        let mut buf = BytesMut::from("?what\r\n");
        assert!(matches!(decode(&mut buf), Err(FrameError::Invalid(_))));
    }

    #[test]
    fn test_oversized_lengths_are_rejected() {
        let mut buf = BytesMut::from("*9223372036854775807\r\n");
        assert!(matches!(decode(&mut buf), Err(FrameError::Invalid(_))));

        let mut buf = BytesMut::from(format!("*{}\r\n", MAX_ARRAY_LEN + 1).as_str());
        assert!(matches!(decode(&mut buf), Err(FrameError::Invalid(_))));

        let mut buf = BytesMut::from(format!("${}\r\nabc", MAX_BULK_LEN + 1).as_str());
        assert!(matches!(decode(&mut buf), Err(FrameError::Invalid(_))));

        let mut buf = BytesMut::from("$9223372036854775807\r\n");
        assert!(matches!(decode(&mut buf), Err(FrameError::Invalid(_))));
    }

    #[test]
    fn test_large_declared_array_waits_for_elements() {
        let mut buf = BytesMut::from("*1000\r\n$4\r\nPING\r\n");
        assert_eq!(decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let mut buf = BytesMut::from("*1\r\n".repeat(MAX_DEPTH + 2).as_str());
        buf.extend_from_slice(b":1\r\n");
        assert!(matches!(decode(&mut buf), Err(FrameError::Invalid(_))));
    }

    #[test]
    fn test_encode_nested() {
        let frame = Frame::array(vec![Frame::bulk("foo"), Frame::integer(-3), Frame::Null]);
        assert_eq!(encode(&frame), Bytes::from("*3\r\n$3\r\nfoo\r\n:-3\r\n$-1\r\n"));
    }
}

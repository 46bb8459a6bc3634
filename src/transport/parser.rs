//! Incremental RESP v2 reply decoding.
//!
//! [`parse`] consumes exactly one reply frame from a [`BufferedReader`];
//! bytes belonging to subsequent frames are left buffered for the next
//! call. The parser never peeks past a frame boundary.

use bytes::Bytes;

use crate::reply::Reply;
use crate::transport::{BufferedReader, Deadline, ReadTimeout};
use crate::{Error, Result};

const CRLF: &[u8] = b"\r\n";

/// Recursion bound on nested arrays, to prevent stack exhaustion from a
/// hostile or buggy peer. Not part of the wire format; purely a local
/// guard.
pub const MAX_ARRAY_DEPTH: usize = 64;

/// Parses a single reply frame, dispatching on the leading type byte.
pub fn parse<S: ReadTimeout>(reader: &mut BufferedReader<S>, deadline: Deadline) -> Result<Reply> {
    parse_at_depth(reader, deadline, 0)
}

fn parse_at_depth<S: ReadTimeout>(
    reader: &mut BufferedReader<S>,
    deadline: Deadline,
    depth: usize,
) -> Result<Reply> {
    let type_byte = reader.read_exact(1, deadline)?;
    match type_byte[0] {
        b'+' => Ok(Reply::SimpleString(read_line(reader, deadline)?)),
        b'-' => Ok(Reply::Error(read_line(reader, deadline)?)),
        b':' => {
            let line = read_line(reader, deadline)?;
            Ok(Reply::Integer(parse_signed_decimal(&line)?))
        }
        b'$' => parse_bulk_string(reader, deadline),
        b'*' => parse_array(reader, deadline, depth),
        other => Err(Error::ProtocolError(format!(
            "unknown type byte: {:#04x}",
            other
        ))),
    }
}

fn parse_bulk_string<S: ReadTimeout>(
    reader: &mut BufferedReader<S>,
    deadline: Deadline,
) -> Result<Reply> {
    let line = read_line(reader, deadline)?;
    let len = parse_signed_decimal(&line)?;
    if len == -1 {
        return Ok(Reply::BulkString(None));
    }
    if len < 0 {
        return Err(Error::ProtocolError(format!(
            "invalid bulk string length: {len}"
        )));
    }
    let payload = reader.read_exact(len as usize, deadline)?;
    let terminator = reader.read_exact(2, deadline)?;
    if terminator.as_ref() != CRLF {
        return Err(Error::ProtocolError(
            "bulk string missing CRLF terminator".to_string(),
        ));
    }
    Ok(Reply::BulkString(Some(payload)))
}

fn parse_array<S: ReadTimeout>(
    reader: &mut BufferedReader<S>,
    deadline: Deadline,
    depth: usize,
) -> Result<Reply> {
    let line = read_line(reader, deadline)?;
    let count = parse_signed_decimal(&line)?;
    if count == -1 {
        return Ok(Reply::Array(None));
    }
    if count < 0 {
        return Err(Error::ProtocolError(format!(
            "invalid array length: {count}"
        )));
    }
    if count > 0 && depth >= MAX_ARRAY_DEPTH {
        return Err(Error::ProtocolError(format!(
            "nested array depth exceeds limit of {MAX_ARRAY_DEPTH}"
        )));
    }
    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        items.push(parse_at_depth(reader, deadline, depth + 1)?);
    }
    Ok(Reply::Array(Some(items)))
}

/// Reads a line up to and including `\r\n`, returning the content with the
/// terminator stripped.
fn read_line<S: ReadTimeout>(reader: &mut BufferedReader<S>, deadline: Deadline) -> Result<Bytes> {
    let raw = reader.read_until(CRLF, deadline)?;
    Ok(raw.slice(0..raw.len() - CRLF.len()))
}

/// Strict decimal parsing shared by integer replies and length prefixes:
/// optional leading `-`, at least one digit, no whitespace, leading zeros
/// permitted, range-checked against `i64`.
fn parse_signed_decimal(bytes: &[u8]) -> Result<i64> {
    if bytes.is_empty() {
        return Err(Error::ProtocolError("empty integer".to_string()));
    }
    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, bytes),
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(Error::ProtocolError(format!(
            "invalid integer: {:?}",
            String::from_utf8_lossy(bytes)
        )));
    }

    let mut magnitude: i128 = 0;
    for &d in digits {
        magnitude = magnitude * 10 + (d - b'0') as i128;
        if magnitude > i64::MAX as i128 + 1 {
            return Err(Error::ProtocolError("integer out of range".to_string()));
        }
    }
    let value = if negative { -magnitude } else { magnitude };
    if value < i64::MIN as i128 || value > i64::MAX as i128 {
        return Err(Error::ProtocolError("integer out of range".to_string()));
    }
    Ok(value as i64)
}

//! The typed value tree produced by the [parser](crate::transport::parser).

use bytes::Bytes;

/// A single reply frame decoded off the wire.
///
/// `Reply` is strictly a tree: arrays may nest but never cycle, so an owned
/// child list is all the representation needs (no shared-ownership
/// machinery).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A short status string, e.g. the `PONG` in `+PONG\r\n`.
    SimpleString(Bytes),
    /// A server-reported application error. This is a reply *value*, not a
    /// transport or parse fault; the connection that produced it stays
    /// healthy.
    Error(Bytes),
    /// A signed 64-bit integer.
    Integer(i64),
    /// A length-prefixed byte payload, or the explicit null bulk (`$-1\r\n`).
    ///
    /// A non-null bulk of declared length zero (`$0\r\n\r\n`) is a distinct
    /// value from the null bulk.
    BulkString(Option<Bytes>),
    /// A possibly-empty, possibly-null ordered list of replies.
    Array(Option<Vec<Reply>>),
}

impl Reply {
    /// Returns the `Error` message if this reply is a server error.
    pub fn as_error(&self) -> Option<&[u8]> {
        match self {
            Reply::Error(msg) => Some(msg.as_ref()),
            _ => None,
        }
    }

    /// True if this is the null bulk or null array sentinel.
    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::BulkString(None) | Reply::Array(None))
    }
}

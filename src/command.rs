//! Encoding a [`Command`] into the RESP unified request wire frame.
//!
//! ```text
//! *<N>\r\n
//! $<len(arg_i)>\r\n<arg_i>\r\n     (for i = 0..N-1)
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

const CRLF: &[u8] = b"\r\n";

/// A non-empty, ordered sequence of byte-string arguments.
///
/// Element zero is conventionally the uppercase ASCII command name; the
/// rest are arguments. Argument bytes are opaque to this type: they are
/// passed through to the wire verbatim, never interpreted or escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    /// Builds a command from an ordered list of arguments.
    ///
    /// Fails with [`Error::InvalidParams`] if `args` is empty (a command
    /// with zero arguments cannot be encoded, `N` must be `>= 1`).
    pub fn new<I, B>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let args: Vec<Bytes> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Err(Error::InvalidParams(
                "command must have at least one argument".to_string(),
            ));
        }
        Ok(Self { args })
    }

    /// Starts an empty command to be filled in with [`Command::arg`].
    ///
    /// Unlike [`Command::new`], this never fails at construction time;
    /// emptiness is instead caught by [`encode`] the way `Command::new`
    /// catches it up front.
    pub fn builder() -> CommandBuilder {
        CommandBuilder { args: Vec::new() }
    }

    /// The number of arguments, including the command name.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }
}

/// An incremental builder for a [`Command`], for callers assembling
/// arguments positionally (numeric args rendered to base-10 ASCII by the
/// caller, boolean flags appended as uppercase ASCII names, array-valued
/// options spliced in as positional arguments).
#[derive(Debug, Default)]
pub struct CommandBuilder {
    args: Vec<Bytes>,
}

impl CommandBuilder {
    pub fn arg<B: Into<Bytes>>(mut self, arg: B) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn build(self) -> Result<Command> {
        Command::new(self.args)
    }
}

/// Encodes a command as a single contiguous byte buffer using the unified
/// request format.
///
/// Allocation is precomputed from the argument lengths (one allocation of
/// known size); encoding is `O(total argument byte length)`.
pub fn encode(command: &Command) -> Bytes {
    let mut total = header_len(command.args.len());
    for arg in &command.args {
        total += header_len(arg.len()) + arg.len() + CRLF.len();
    }

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u8(b'*');
    put_decimal(&mut buf, command.args.len() as i64);
    buf.put_slice(CRLF);
    for arg in &command.args {
        buf.put_u8(b'$');
        put_decimal(&mut buf, arg.len() as i64);
        buf.put_slice(CRLF);
        buf.put_slice(arg);
        buf.put_slice(CRLF);
    }
    buf.freeze()
}

/// Number of bytes the header (`*N\r\n` or `$N\r\n`) itself occupies.
fn header_len(n: usize) -> usize {
    1 + decimal_len(n as i64) + CRLF.len()
}

fn decimal_len(n: i64) -> usize {
    if n == 0 {
        return 1;
    }
    let mut n = n.unsigned_abs();
    let mut count = 0;
    while n > 0 {
        n /= 10;
        count += 1;
    }
    count
}

fn put_decimal(buf: &mut BytesMut, n: i64) {
    let s = n.to_string();
    buf.put_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_round_trip_wire_bytes() {
        let cmd = Command::new(["PING"]).unwrap();
        let encoded = encode(&cmd);
        assert_eq!(encoded.as_ref(), b"*1\r\n$4\r\nPING\r\n");
    }

    #[test]
    fn get_with_missing_key() {
        let cmd = Command::new(["GET", "missing"]).unwrap();
        let encoded = encode(&cmd);
        assert_eq!(encoded.as_ref(), b"*2\r\n$3\r\nGET\r\n$7\r\nmissing\r\n");
    }

    #[test]
    fn arbitrary_bytes_pass_through_verbatim() {
        let cmd = Command::new([Bytes::from_static(b"SET"), Bytes::from_static(b"k"), Bytes::from_static(b"\x00\x01\r\n\xff")]).unwrap();
        let encoded = encode(&cmd);
        assert_eq!(
            encoded.as_ref(),
            &b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$4\r\n\x00\x01\r\n\xff\r\n"[..]
        );
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = Command::new(Vec::<Bytes>::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[test]
    fn builder_assembles_positional_args() {
        let cmd = Command::builder()
            .arg("ZADD")
            .arg("key")
            .arg("NX")
            .arg("1")
            .arg("member")
            .build()
            .unwrap();
        assert_eq!(cmd.len(), 5);
    }
}

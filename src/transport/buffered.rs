//! Fixed-capacity, deadline-aware read buffer over a [`ReadTimeout`] stream.

use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};

use crate::transport::ReadTimeout;
use crate::{Error, Result};

/// Default and minimum read-buffer capacity.
pub const DEFAULT_BUF_CAPACITY: usize = 1024;

/// Size of the scratch buffer used for each individual stream read.
const READ_CHUNK_SIZE: usize = 4096;

/// An absolute point in time by which a read must complete, or the
/// explicit absence of one.
#[derive(Debug, Clone, Copy)]
pub enum Deadline {
    /// Block indefinitely.
    None,
    /// Fail with [`Error::Timeout`] once this instant passes.
    At(Instant),
}

impl Deadline {
    /// A deadline `dur` from now, or [`Deadline::None`] if `dur` is `None`.
    pub fn after(dur: Option<Duration>) -> Self {
        match dur {
            Some(dur) => Deadline::At(Instant::now() + dur),
            None => Deadline::None,
        }
    }

    fn is_expired(&self) -> bool {
        match self {
            Deadline::None => false,
            Deadline::At(at) => *at <= Instant::now(),
        }
    }

    /// Remaining budget to hand to the transport-level read timeout.
    /// `None` means "no timeout" (block indefinitely).
    fn remaining(&self) -> Option<Duration> {
        match self {
            Deadline::None => None,
            Deadline::At(at) => Some(at.saturating_duration_since(Instant::now())),
        }
    }
}

/// A growable read buffer sitting in front of a single stream.
///
/// Writes bypass this buffer entirely (the serializer emits one
/// contiguous frame and the connection writes it directly). This asymmetry
/// is intentional: only the read side needs framing to recover mid-stream.
#[derive(Debug)]
pub struct BufferedReader<S: ReadTimeout> {
    stream: S,
    buf: BytesMut,
}

impl<S: ReadTimeout> BufferedReader<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Returns exactly `n` bytes, refilling from the stream as needed.
    pub fn read_exact(&mut self, n: usize, deadline: Deadline) -> Result<Bytes> {
        self.ensure_capacity(n);
        while self.buf.len() < n {
            self.refill(deadline)?;
        }
        Ok(self.buf.split_to(n).freeze())
    }

    /// Returns bytes up to and including the first occurrence of `delim`.
    pub fn read_until(&mut self, delim: &[u8], deadline: Deadline) -> Result<Bytes> {
        loop {
            if let Some(pos) = find_subslice(&self.buf, delim) {
                let end = pos + delim.len();
                return Ok(self.buf.split_to(end).freeze());
            }
            self.refill(deadline)?;
        }
    }

    /// Doubles capacity until it would hold `n` bytes. Never shrinks below
    /// [`DEFAULT_BUF_CAPACITY`].
    fn ensure_capacity(&mut self, n: usize) {
        let mut target = self.buf.capacity().max(DEFAULT_BUF_CAPACITY);
        while target < n {
            target *= 2;
        }
        let additional = target.saturating_sub(self.buf.capacity());
        if additional > 0 {
            self.buf.reserve(additional);
        }
    }

    /// Issues one raw stream read at the remaining deadline budget.
    fn refill(&mut self, deadline: Deadline) -> Result<()> {
        if deadline.is_expired() {
            return Err(Error::Timeout);
        }
        self.stream.set_read_timeout(deadline.remaining())?;

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        match self.stream.read(&mut chunk) {
            Ok(0) => Err(Error::Eof),
            Ok(n) => {
                self.buf.extend_from_slice(&chunk[..n]);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                Err(Error::Timeout)
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    /// An in-memory stream for exercising `BufferedReader` without a real
    /// socket: feeds fixed bytes, then reports EOF.
    #[derive(Debug)]
    struct MockStream {
        data: std::io::Cursor<Vec<u8>>,
    }

    impl MockStream {
        fn new(data: &[u8]) -> Self {
            Self {
                data: std::io::Cursor::new(data.to_vec()),
            }
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.data.read(buf)
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl ReadTimeout for MockStream {
        fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn read_exact_returns_requested_bytes() {
        let mut reader = BufferedReader::new(MockStream::new(b"hello world"));
        let got = reader.read_exact(5, Deadline::None).unwrap();
        assert_eq!(got.as_ref(), b"hello");
        let rest = reader.read_exact(6, Deadline::None).unwrap();
        assert_eq!(rest.as_ref(), b" world");
    }

    #[test]
    fn read_exact_past_eof_fails() {
        let mut reader = BufferedReader::new(MockStream::new(b"abc"));
        let err = reader.read_exact(10, Deadline::None).unwrap_err();
        assert!(matches!(err, Error::Eof));
    }

    #[test]
    fn read_until_stops_at_delimiter_and_leaves_remainder_buffered() {
        let mut reader = BufferedReader::new(MockStream::new(b"+OK\r\n:42\r\n"));
        let first = reader.read_until(b"\r\n", Deadline::None).unwrap();
        assert_eq!(first.as_ref(), b"+OK\r\n");
        let second = reader.read_until(b"\r\n", Deadline::None).unwrap();
        assert_eq!(second.as_ref(), b":42\r\n");
    }

    #[test]
    fn already_expired_deadline_times_out_immediately() {
        let mut reader = BufferedReader::new(MockStream::new(b"abc"));
        let expired = Deadline::At(Instant::now() - Duration::from_secs(1));
        let err = reader.read_exact(10, expired).unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[test]
    fn ensure_capacity_grows_for_large_reads() {
        let data = vec![b'x'; 5000];
        let mut reader = BufferedReader::new(MockStream::new(&data));
        let got = reader.read_exact(5000, Deadline::None).unwrap();
        assert_eq!(got.len(), 5000);
    }
}

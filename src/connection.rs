//! Owns a stream and its [`BufferedReader`], exposing the `send_command` /
//! `read_reply` / `run_command` surface and the `Fresh -> Open -> (Closed |
//! Poisoned)` lifecycle.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use derive_more::Display;
use tracing::{debug, warn};

use crate::command::{self, Command};
use crate::reply::Reply;
use crate::transport::{BufferedReader, Deadline, ReadTimeout};
use crate::{Error, Result};

/// A connection's lifecycle state. `Fresh` has no runtime representation:
/// `Connection::connect_*` only ever returns an already-`Open` connection,
/// so the type itself cannot express the pre-connect state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
enum State {
    Open,
    Closed,
    Poisoned,
}

/// Owns one live (or formerly live) transport.
///
/// Not safe for concurrent use by multiple threads: within one connection,
/// requests and replies are strictly serialized (the single
/// pending-request invariant) and nothing here synchronizes `&mut self`
/// access across threads. Concurrent callers coordinate through
/// [`Pool`](crate::pool::Pool) instead, which hands each connection to at
/// most one caller at a time.
#[derive(Debug)]
pub struct Connection {
    reader: BufferedReader<Box<dyn ReadTimeout>>,
    timeout: Option<Duration>,
    state: State,
}

impl Connection {
    fn from_stream(stream: Box<dyn ReadTimeout>, read_timeout: Option<Duration>) -> Result<Self> {
        let mut reader = BufferedReader::new(stream);
        reader.get_mut().set_read_timeout(read_timeout)?;
        Ok(Self {
            reader,
            timeout: read_timeout,
            state: State::Open,
        })
    }

    /// Establishes a TCP connection with `TCP_NODELAY` enabled, honoring
    /// `connect_timeout`. `host` is resolved via the standard resolver;
    /// every resolved address is tried in turn, each against the full
    /// `connect_timeout` budget, until one succeeds.
    pub fn connect_tcp(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        read_timeout: Option<Duration>,
    ) -> Result<Self> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::ConnectError(e.to_string()))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_nodelay(true)
                        .map_err(|e| Error::ConnectError(e.to_string()))?;
                    debug!(%addr, "connected");
                    return Self::from_stream(Box::new(stream), read_timeout);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(Error::ConnectError(
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("no addresses resolved for {host}:{port}")),
        ))
    }

    /// Connects to a local (Unix-domain) socket by filesystem path. No
    /// socket options are applied. Only available on Unix-like platforms.
    #[cfg(unix)]
    pub fn connect_local(
        path: impl AsRef<std::path::Path>,
        read_timeout: Option<Duration>,
    ) -> Result<Self> {
        let stream = std::os::unix::net::UnixStream::connect(path.as_ref())
            .map_err(|e| Error::ConnectError(e.to_string()))?;
        Self::from_stream(Box::new(stream), read_timeout)
    }

    /// Serializes `command` and writes it to the stream, returning the
    /// number of bytes written.
    ///
    /// Writes bypass the read buffer entirely (the serializer emits one
    /// contiguous frame); any write failure poisons the connection.
    pub fn send_command(&mut self, command: &Command) -> Result<usize> {
        self.ensure_open()?;
        let frame = command::encode(command);
        match self.reader.get_mut().write_all(&frame) {
            Ok(()) => Ok(frame.len()),
            Err(e) => {
                warn!(error = %e, "write failed, poisoning connection");
                self.state = State::Poisoned;
                Err(Error::Io(e))
            }
        }
    }

    /// Reads and parses exactly one reply frame using the current timeout.
    ///
    /// Returns the [`Reply`] unchanged, including `Reply::Error` values
    /// (server-reported application errors, not faults, which leave the
    /// connection healthy). Any other failure (`Timeout`, `Eof`,
    /// `ProtocolError`, `Io`) poisons the connection.
    pub fn read_reply(&mut self) -> Result<Reply> {
        self.ensure_open()?;
        let deadline = Deadline::after(self.timeout);
        match crate::transport::parse(&mut self.reader, deadline) {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(error = %e, "read failed, poisoning connection");
                self.state = State::Poisoned;
                Err(e)
            }
        }
    }

    /// Convenience composition of [`Connection::send_command`] followed by
    /// [`Connection::read_reply`].
    pub fn run_command(&mut self, command: Command) -> Result<Reply> {
        self.send_command(&command)?;
        self.read_reply()
    }

    /// Updates the deadline used by subsequent reads.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Closes the stream. Idempotent.
    pub fn close(&mut self) {
        if self.state == State::Closed {
            return;
        }
        let _ = self.reader.get_mut().shutdown();
        self.state = State::Closed;
    }

    pub fn is_connected(&self) -> bool {
        self.state == State::Open
    }

    pub(crate) fn is_poisoned(&self) -> bool {
        self.state == State::Poisoned
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            State::Open => Ok(()),
            State::Closed => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "connection is closed",
            ))),
            State::Poisoned => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "connection is poisoned",
            ))),
        }
    }
}

//! Buffered reads and reply parsing over a byte stream.

use std::io::{Read, Write};
use std::time::Duration;

pub mod buffered;
pub mod parser;

pub use buffered::{BufferedReader, Deadline, DEFAULT_BUF_CAPACITY};
pub use parser::{parse, MAX_ARRAY_DEPTH};

/// Unifies heterogeneous stream types a [`BufferedReader`] can sit on top
/// of.
///
/// A persistent RESP session has no notion of draining stray bytes
/// between requests (the single-pending-request invariant means there
/// are none), so the one thing every stream needs to expose here is the
/// platform read-timeout knob the deadline math in [`buffered`] depends
/// on.
pub trait ReadTimeout: Read + Write + std::fmt::Debug + Send {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()>;

    /// Shuts down the stream. Default no-op for transports (e.g. test
    /// mocks) with nothing meaningful to shut down; real socket transports
    /// override this to close both halves.
    fn shutdown(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ReadTimeout for std::net::TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        std::net::TcpStream::set_read_timeout(self, timeout)
    }

    fn shutdown(&mut self) -> std::io::Result<()> {
        std::net::TcpStream::shutdown(self, std::net::Shutdown::Both)
    }
}

#[cfg(unix)]
impl ReadTimeout for std::os::unix::net::UnixStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        std::os::unix::net::UnixStream::set_read_timeout(self, timeout)
    }

    fn shutdown(&mut self) -> std::io::Result<()> {
        std::os::unix::net::UnixStream::shutdown(self, std::net::Shutdown::Both)
    }
}

impl ReadTimeout for Box<dyn ReadTimeout> {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn shutdown(&mut self) -> std::io::Result<()> {
        (**self).shutdown()
    }
}

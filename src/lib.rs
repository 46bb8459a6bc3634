//! A client core for RESP-style, length-prefixed request/response key-value
//! protocols.
//!
//! `respwire` connects to a single server instance over a stream transport,
//! serializes commands into the wire format, parses server replies into a
//! typed [`Reply`] tree, and coordinates access to the connection from many
//! concurrent callers via a bounded [`Pool`].
//!
//! Out of scope: the catalogue of per-command wrapper methods (`GET`, `SET`,
//! …). Those are thin adapters other crates build on top of
//! [`Connection::run_command`]. Also out of scope: pipelining, pub/sub
//! streaming, scripting helpers, and cluster routing.
//!
//! # Example
//! This example checks a connection out of a pool and issues a `PING`.
//!
//! ```no_run
//! # fn example() -> respwire::Result<()> {
//! use respwire::{PoolBuilder, Command};
//!
//! let pool = PoolBuilder::new().tcp("127.0.0.1", 6379).size(5).build()?;
//! let reply = pool.with(|conn| conn.run_command(Command::new(["PING"])?))?;
//! println!("{reply:?}");
//! # Ok(())
//! # }
//! ```
//!
//! # Example
//! This example opens a single connection directly (no pool) and issues a
//! `GET` for a key that does not exist, observing the null bulk reply.
//!
//! ```no_run
//! # fn example() -> respwire::Result<()> {
//! use respwire::{Connection, Command, Reply};
//! use std::time::Duration;
//!
//! let mut conn = Connection::connect_tcp(
//!     "127.0.0.1",
//!     6379,
//!     Duration::from_secs(1),
//!     Some(Duration::from_secs(1)),
//! )?;
//! let reply = conn.run_command(Command::new(["GET", "missing"])?)?;
//! assert_eq!(reply, Reply::BulkString(None));
//! # Ok(())
//! # }
//! ```
use thiserror::Error;

pub mod builder;
pub mod command;
pub mod config;
pub mod connection;
pub mod pool;
pub mod reply;
pub mod transport;

pub use builder::PoolBuilder;
pub use command::Command;
pub use connection::Connection;
pub use pool::{Pool, PooledConnection};
pub use reply::Reply;

/// The error taxonomy shared by every component of the crate.
///
/// Every variant here is a transport or protocol *fault*: one that, when
/// raised on a live [`Connection`], poisons it (see each variant's own
/// doc for whether a connection exists to poison). A `-ERR ...\r\n` reply
/// frame is *not* one of these. It surfaces as
/// [`Reply::Error`](crate::reply::Reply::Error), a value the connection
/// returns normally and stays healthy afterward.
#[derive(Error, Debug)]
pub enum Error {
    /// TCP or local-socket connect failed or timed out. No connection
    /// exists to poison.
    #[error("failed to connect: {0}")]
    ConnectError(String),
    /// The underlying stream read or write failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A read deadline (or connect deadline) expired before the operation
    /// completed.
    #[error("operation timed out")]
    Timeout,
    /// The stream closed while a frame was only partially read.
    #[error("unexpected end of stream")]
    Eof,
    /// A malformed frame: bad length, missing terminator, unknown type
    /// byte, or nested-array depth limit exceeded.
    #[error("protocol error: {0}")]
    ProtocolError(String),
    /// `Pool::checkout` waited past its acquisition timeout.
    #[error("timed out waiting for a pooled connection")]
    PoolTimeout,
    /// `Pool::checkout` was called after `Pool::shutdown`.
    #[error("pool has been shut down")]
    PoolClosed,
    /// A caller-supplied argument violates a precondition (e.g. an empty
    /// command).
    #[error("{0}")]
    InvalidParams(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

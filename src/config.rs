//! Pool and connection configuration: the options table from the pool spec,
//! plus the connection factory a [`Pool`](crate::pool::Pool) holds to create
//! new connections lazily.

use std::path::PathBuf;
use std::time::Duration;

use crate::connection::Connection;
use crate::Result;

pub(crate) const DEFAULT_SIZE: usize = 5;
pub(crate) const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
pub(crate) const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
pub(crate) const DEFAULT_HOST: &str = "127.0.0.1";
pub(crate) const DEFAULT_PORT: u16 = 6379;

/// Where a pool's connections point: a TCP host/port pair or a local
/// (Unix-domain) socket path. Mutually exclusive, chosen once via
/// [`crate::builder::PoolBuilder`]'s type-state `tcp`/`local` methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Tcp { host: String, port: u16 },
    #[cfg(unix)]
    Local { path: PathBuf },
}

/// Captures everything a [`Pool`](crate::pool::Pool) needs to create a new
/// [`Connection`] on demand: the connection target plus the per-connection
/// timeouts assigned at construction time.
#[derive(Debug, Clone)]
pub(crate) struct Factory {
    pub(crate) target: Target,
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
}

impl Factory {
    pub(crate) fn connect(&self) -> Result<Connection> {
        match &self.target {
            Target::Tcp { host, port } => {
                Connection::connect_tcp(host, *port, self.connect_timeout, Some(self.read_timeout))
            }
            #[cfg(unix)]
            Target::Local { path } => Connection::connect_local(path, Some(self.read_timeout)),
        }
    }
}

/// Pool-wide sizing and acquisition-timeout configuration, independent of
/// the connection target.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PoolConfig {
    pub(crate) size: usize,
    pub(crate) acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

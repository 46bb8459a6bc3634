//! Type-state builder for [`Pool`]: the connection target is chosen once
//! (`Init -> Tcp | Local`), then shared options are layered on before
//! `build()`.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    Factory, PoolConfig, Target, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST,
    DEFAULT_PORT, DEFAULT_READ_TIMEOUT, DEFAULT_SIZE,
};
use crate::pool::Pool;
use crate::Result;

/// Type-state marker: no connection target chosen yet.
pub struct Init;
/// Type-state marker: building a TCP-backed pool.
pub struct Tcp;
/// Type-state marker: building a local-socket-backed pool.
#[cfg(unix)]
pub struct Local;

/// Builds a [`Pool`] by first choosing a connection target (`.tcp(..)` or
/// `.local(..)`), then layering on shared options, then `.build()`.
pub struct PoolBuilder<T> {
    host: String,
    port: u16,
    path: Option<PathBuf>,
    size: usize,
    acquire_timeout: Duration,
    connect_timeout: Duration,
    read_timeout: Duration,
    _marker: PhantomData<T>,
}

impl Default for PoolBuilder<Init> {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolBuilder<Init> {
    /// Starts the type-state builder pattern.
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path: None,
            size: DEFAULT_SIZE,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            _marker: PhantomData,
        }
    }

    /// Continues in the path to build a pool backed by TCP connections.
    pub fn tcp(self, host: impl Into<String>, port: u16) -> PoolBuilder<Tcp> {
        PoolBuilder {
            host: host.into(),
            port,
            path: None,
            size: self.size,
            acquire_timeout: self.acquire_timeout,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            _marker: PhantomData,
        }
    }

    /// Continues in the path to build a pool backed by a local (Unix-domain)
    /// socket. Compiled only under `cfg(unix)`, matching the Non-goal that
    /// scopes this transport to Unix-like platforms.
    #[cfg(unix)]
    pub fn local(self, path: impl Into<PathBuf>) -> PoolBuilder<Local> {
        PoolBuilder {
            host: self.host,
            port: self.port,
            path: Some(path.into()),
            size: self.size,
            acquire_timeout: self.acquire_timeout,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            _marker: PhantomData,
        }
    }
}

/// Shared setters, available once a connection target has been chosen (or
/// before; they only take effect at `.build()`).
impl<T> PoolBuilder<T> {
    /// Maximum number of simultaneous live connections. Default 5.
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Maximum time a caller waits for a free connection. Default 5s.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Per-connection TCP/local connect deadline. Default 1s.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Initial read deadline assigned to new connections. Default 1s.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl PoolBuilder<Tcp> {
    /// Builds the pool. Connections are created lazily on first checkout,
    /// not here.
    pub fn build(self) -> Result<Pool> {
        Ok(Pool::new(
            Factory {
                target: Target::Tcp {
                    host: self.host,
                    port: self.port,
                },
                connect_timeout: self.connect_timeout,
                read_timeout: self.read_timeout,
            },
            PoolConfig {
                size: self.size,
                acquire_timeout: self.acquire_timeout,
            },
        ))
    }
}

#[cfg(unix)]
impl PoolBuilder<Local> {
    /// Builds the pool. Connections are created lazily on first checkout,
    /// not here.
    pub fn build(self) -> Result<Pool> {
        Ok(Pool::new(
            Factory {
                target: Target::Local {
                    path: self.path.expect("local target always has a path"),
                },
                connect_timeout: self.connect_timeout,
                read_timeout: self.read_timeout,
            },
            PoolConfig {
                size: self.size,
                acquire_timeout: self.acquire_timeout,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let builder = PoolBuilder::new();
        assert_eq!(builder.size, 5);
        assert_eq!(builder.acquire_timeout, Duration::from_secs(5));
        assert_eq!(builder.connect_timeout, Duration::from_secs(1));
        assert_eq!(builder.read_timeout, Duration::from_secs(1));
        assert_eq!(builder.host, "127.0.0.1");
        assert_eq!(builder.port, 6379);
    }

    #[test]
    fn tcp_builder_overrides_host_and_port() {
        let builder = PoolBuilder::new().tcp("10.0.0.1", 7000).size(10);
        assert_eq!(builder.host, "10.0.0.1");
        assert_eq!(builder.port, 7000);
        assert_eq!(builder.size, 10);
    }
}

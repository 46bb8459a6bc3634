//! A bounded, thread-safe pool of [`Connection`]s with acquisition timeout,
//! scoped checkout, and graceful shutdown.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex};
use std::time::Instant;

use tracing::{debug, warn};

use crate::config::{Factory, PoolConfig};
use crate::connection::Connection;
use crate::{Error, Result};

struct Inner {
    idle: VecDeque<Connection>,
    /// Connections either idle or checked out. `total <= config.size` always.
    total: usize,
    shutting_down: bool,
}

/// A bounded set of [`Connection`]s shared across threads.
///
/// The only shared mutable state lives in [`Inner`], guarded by one mutex
/// with one associated condition variable; connections themselves are
/// exclusively owned by whoever currently holds them (the idle queue while
/// checked in, the caller, via [`PooledConnection`], while checked out).
pub struct Pool {
    state: Mutex<Inner>,
    condvar: Condvar,
    factory: Factory,
    config: PoolConfig,
}

impl Pool {
    pub(crate) fn new(factory: Factory, config: PoolConfig) -> Self {
        Self {
            state: Mutex::new(Inner {
                idle: VecDeque::new(),
                total: 0,
                shutting_down: false,
            }),
            condvar: Condvar::new(),
            factory,
            config,
        }
    }

    /// Checks out a live connection, waiting up to the pool's acquisition
    /// timeout if none is immediately available.
    ///
    /// Preference order: pop an idle connection; else, if under capacity,
    /// create one via the factory; else wait on the condition variable
    /// (FIFO-fair, since each waiter re-checks the same queue in wakeup
    /// order) until a connection is checked in or the deadline passes.
    pub fn checkout(&self) -> Result<PooledConnection<'_>> {
        let deadline = Instant::now() + self.config.acquire_timeout;
        let mut guard = self.state.lock().unwrap();
        loop {
            if guard.shutting_down {
                return Err(Error::PoolClosed);
            }
            if let Some(conn) = guard.idle.pop_front() {
                return Ok(PooledConnection::new(self, conn));
            }
            if guard.total < self.config.size {
                guard.total += 1;
                // Connect without holding the lock: TCP/local connect can
                // block for up to `connect_timeout`, and other threads
                // should be able to pop idle connections meanwhile.
                drop(guard);
                return match self.factory.connect() {
                    Ok(conn) => {
                        debug!("pool created a new connection");
                        Ok(PooledConnection::new(self, conn))
                    }
                    Err(e) => {
                        let mut guard = self.state.lock().unwrap();
                        guard.total -= 1;
                        self.condvar.notify_one();
                        Err(e)
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::PoolTimeout);
            }
            let (g, _timeout) = self.condvar.wait_timeout(guard, deadline - now).unwrap();
            guard = g;
        }
    }

    /// Scoped acquisition: checks out a connection, invokes `f`, and checks
    /// it back in on every exit path (including a panic unwinding through
    /// `f`), via [`PooledConnection`]'s `Drop` impl.
    pub fn with<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.checkout()?;
        f(&mut conn)
    }

    /// Closes every idle connection and rejects subsequent checkouts.
    /// Connections currently checked out are closed as they are returned.
    pub fn shutdown(&self) {
        let mut guard = self.state.lock().unwrap();
        guard.shutting_down = true;
        for mut conn in guard.idle.drain(..) {
            conn.close();
        }
        guard.total = 0;
        self.condvar.notify_all();
    }

    fn checkin(&self, mut conn: Connection, healthy: bool) {
        let mut guard = self.state.lock().unwrap();
        if healthy && !guard.shutting_down {
            guard.idle.push_back(conn);
        } else {
            conn.close();
            warn!("discarding unhealthy connection on checkin");
            guard.total = guard.total.saturating_sub(1);
        }
        self.condvar.notify_one();
    }
}

/// RAII guard returned by [`Pool::checkout`]. Derefs to [`Connection`]; on
/// drop, returns the connection to the pool if still healthy, or closes it
/// and frees its slot otherwise. This is the sole mechanism by which a
/// fault observed mid-use (poisoning) is discovered and the connection
/// discarded. The pool never actively pings idle connections.
pub struct PooledConnection<'a> {
    pool: &'a Pool,
    conn: Option<Connection>,
}

impl<'a> PooledConnection<'a> {
    fn new(pool: &'a Pool, conn: Connection) -> Self {
        Self {
            pool,
            conn: Some(conn),
        }
    }
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection taken only on drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection taken only on drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let healthy = conn.is_connected();
            self.pool.checkin(conn, healthy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PoolBuilder;
    use crate::command::Command;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// Installs a test-scoped `tracing` subscriber so the pool's `debug!`/
    /// `warn!` calls print under `cargo test -- --nocapture`. Safe to call
    /// from every test: a subscriber is already installed globally by the
    /// first caller, so later calls just no-op.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    /// Spawns a loopback server that replies `+OK\r\n` to every request it
    /// reads, forever, until the listener is dropped.
    fn spawn_ok_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                thread::spawn(move || loop {
                    let mut buf = [0u8; 256];
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            if stream.write_all(b"+OK\r\n").is_err() {
                                break;
                            }
                        }
                    }
                });
            }
        });
        port
    }

    #[test]
    fn checkout_creates_up_to_size_then_waits() {
        init_tracing();
        let port = spawn_ok_server();
        let pool = Arc::new(
            PoolBuilder::new()
                .tcp("127.0.0.1", port)
                .size(1)
                .timeout(Duration::from_millis(100))
                .build()
                .unwrap(),
        );
        let guard = pool.checkout().unwrap();
        let err = pool.checkout().unwrap_err();
        assert!(matches!(err, Error::PoolTimeout));
        drop(guard);
        // After the sole connection is returned, checkout succeeds again.
        let _guard2 = pool.checkout().unwrap();
    }

    #[test]
    fn with_runs_a_command_and_checks_connection_back_in() {
        init_tracing();
        let port = spawn_ok_server();
        let pool = PoolBuilder::new()
            .tcp("127.0.0.1", port)
            .size(2)
            .build()
            .unwrap();
        let reply = pool
            .with(|conn| conn.run_command(Command::new(["PING"]).unwrap()))
            .unwrap();
        assert_eq!(
            reply,
            crate::reply::Reply::SimpleString(bytes::Bytes::from_static(b"OK"))
        );
        // Checked back in: a second call succeeds without creating a new
        // connection past size=2.
        pool.with(|conn| conn.run_command(Command::new(["PING"]).unwrap()))
            .unwrap();
    }

    #[test]
    fn poisoned_connection_is_discarded_and_replaced() {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 256];
                let _ = stream.read(&mut buf);
                // Malformed reply: poisons the connection on read.
                let _ = stream.write_all(b"!garbage\r\n");
            }
        });
        let pool = PoolBuilder::new()
            .tcp("127.0.0.1", port)
            .size(1)
            .build()
            .unwrap();
        let err = pool
            .with(|conn| conn.run_command(Command::new(["PING"]).unwrap()))
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolError(_)));

        let guard = pool.state.lock().unwrap();
        assert_eq!(guard.total, 0);
        assert!(guard.idle.is_empty());
    }

    #[test]
    fn shutdown_closes_idle_connections_and_rejects_checkout() {
        init_tracing();
        let port = spawn_ok_server();
        let pool = PoolBuilder::new()
            .tcp("127.0.0.1", port)
            .size(2)
            .build()
            .unwrap();
        {
            let _guard = pool.checkout().unwrap();
        }
        pool.shutdown();
        let err = pool.checkout().unwrap_err();
        assert!(matches!(err, Error::PoolClosed));
    }

    #[test]
    fn waiters_are_served_without_starvation() {
        init_tracing();
        let port = spawn_ok_server();
        let pool = Arc::new(
            PoolBuilder::new()
                .tcp("127.0.0.1", port)
                .size(1)
                .timeout(Duration::from_millis(500))
                .build()
                .unwrap(),
        );

        let mut handles = Vec::new();
        for _ in 0..3 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                let guard = pool.checkout().unwrap();
                thread::sleep(Duration::from_millis(50));
                drop(guard);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}

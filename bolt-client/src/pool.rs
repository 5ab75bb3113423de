//! Pooled connections keyed by server address.
//!
//! The pool hands ownership of a connection to one consumer at a time:
//! acquiring moves an idle connection (or a freshly opened one) out of the
//! pool, releasing moves it back. Exclusive use is therefore enforced by
//! ownership rather than by per-connection locks.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Mutex, MutexGuard};

use crate::connection::{Address, Connection};
use crate::error::ClientError;

#[cfg(test)]
mod tests;

/// A factory opening new connections for a pool.
pub type Connector<S> = Box<dyn Fn(&Address) -> Result<Connection<S>, ClientError> + Send + Sync>;

/// A thread-safe pool of connections, one set per server address.
pub struct ConnectionPool<S: Read + Write> {
    connector: Connector<S>,
    inner: Mutex<PoolInner<S>>,
}

struct PoolInner<S: Read + Write> {
    servers: HashMap<Address, ServerEntry<S>>,
}

struct ServerEntry<S: Read + Write> {
    idle: Vec<Connection<S>>,
    in_use: usize,
}

impl<S: Read + Write> Default for ServerEntry<S> {
    fn default() -> Self {
        Self {
            idle: Vec::new(),
            in_use: 0,
        }
    }
}

impl<S: Read + Write> ConnectionPool<S> {
    /// Creates a pool that opens connections with `connector`.
    pub fn new(connector: Connector<S>) -> Self {
        Self {
            connector,
            inner: Mutex::new(PoolInner {
                servers: HashMap::new(),
            }),
        }
    }

    /// Hands out a connection to `address`, reusing an idle one when
    /// possible and opening a new one otherwise.
    pub fn acquire(&self, address: &Address) -> Result<Connection<S>, ClientError> {
        let mut inner = self.locked();
        let entry = inner.servers.entry(address.clone()).or_default();
        while let Some(connection) = entry.idle.pop() {
            // stale connections are dropped rather than handed out
            if !connection.closed() && !connection.defunct() {
                entry.in_use += 1;
                return Ok(connection);
            }
        }
        let connection = (self.connector)(address)?;
        let entry = inner.servers.entry(address.clone()).or_default();
        entry.in_use += 1;
        Ok(connection)
    }

    /// Returns a connection to the pool. Closed or defunct connections are
    /// discarded instead of being pooled for reuse.
    pub fn release(&self, connection: Connection<S>) {
        let mut inner = self.locked();
        let entry = inner
            .servers
            .entry(connection.address().clone())
            .or_default();
        entry.in_use = entry.in_use.saturating_sub(1);
        if !connection.closed() && !connection.defunct() {
            entry.idle.push(connection);
        }
    }

    /// Closes every pooled connection and forgets all addresses. Idempotent;
    /// connections currently handed out are closed when their sessions end.
    pub fn close(&self) {
        let mut inner = self.locked();
        for (_, mut entry) in inner.servers.drain() {
            for connection in &mut entry.idle {
                connection.close();
            }
        }
    }

    /// The number of connections to `address` currently handed out.
    pub fn in_use_count(&self, address: &Address) -> usize {
        self.locked()
            .servers
            .get(address)
            .map_or(0, |entry| entry.in_use)
    }

    /// The number of idle pooled connections to `address`.
    pub fn idle_count(&self, address: &Address) -> usize {
        self.locked()
            .servers
            .get(address)
            .map_or(0, |entry| entry.idle.len())
    }

    fn locked(&self) -> MutexGuard<'_, PoolInner<S>> {
        self.inner.lock().expect("connection pool lock poisoned")
    }
}

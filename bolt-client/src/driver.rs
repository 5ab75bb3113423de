//! Drivers: thread-safe session factories holding a connection pool.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Config;
use crate::connection::{connect, Address};
use crate::error::ClientError;
use crate::pool::{ConnectionPool, Connector};
use crate::routing::RoundRobinSet;
use crate::security::SecurityPlan;
use crate::session::Session;
use crate::stream::BoltStream;


/// Whether a session is intended for reads or for writes. A routing driver
/// dispatches sessions to a reader or writer accordingly; a direct driver
/// ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// The session will only read.
    Read,

    /// The session may write.
    Write,
}

/// An accessor for a graph database, holding the settings and pooled
/// connections that sessions are made from.
///
/// A driver is thread-safe; the sessions it hands out are not, and each
/// thread should hold its own.
pub enum Driver {
    /// A driver addressing a single server directly.
    Direct(DirectDriver),

    /// A driver dispatching sessions across a cluster.
    Routing(RoutingDriver),
}

impl Driver {
    /// Creates a new session based on the graph database details specified
    /// within this driver.
    pub fn session(&self, access_mode: AccessMode) -> Result<Session, ClientError> {
        match self {
            Driver::Direct(driver) => driver.session(access_mode),
            Driver::Routing(driver) => driver.session(access_mode),
        }
    }

    /// Whether connections made by this driver are encrypted.
    pub fn encrypted(&self) -> bool {
        match self {
            Driver::Direct(driver) => driver.encrypted(),
            Driver::Routing(driver) => driver.encrypted(),
        }
    }

    /// Closes every pooled connection. Idempotent.
    pub fn close(&self) {
        match self {
            Driver::Direct(driver) => driver.close(),
            Driver::Routing(driver) => driver.close(),
        }
    }
}

fn make_connector(plan: SecurityPlan, config: Config) -> Connector<BoltStream> {
    Box::new(move |address| connect(address, &plan, &config))
}

/// A driver created from a `bolt` URI, addressing a single database
/// instance.
pub struct DirectDriver {
    address: Address,
    encrypted: bool,
    pool: Arc<ConnectionPool<BoltStream>>,
}

impl DirectDriver {
    pub(crate) fn new(address: Address, config: Config) -> Result<Self, ClientError> {
        let plan = SecurityPlan::build(&config)?;
        let encrypted = plan.encrypted();
        let pool = Arc::new(ConnectionPool::new(make_connector(plan, config)));
        Ok(Self {
            address,
            encrypted,
            pool,
        })
    }

    /// The address this driver connects to.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Whether connections made by this driver are encrypted.
    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    /// Creates a new session holding a pooled connection to this driver's
    /// address. The access mode is ignored.
    pub fn session(&self, _access_mode: AccessMode) -> Result<Session, ClientError> {
        let connection = self.pool.acquire(&self.address)?;
        Ok(Session::new(connection, self.pool.clone()))
    }

    /// Closes every pooled connection. Idempotent.
    pub fn close(&self) {
        self.pool.close();
    }
}

impl Drop for DirectDriver {
    fn drop(&mut self) {
        self.close();
    }
}

struct RoutingTable {
    routers: RoundRobinSet<Address>,
    readers: RoundRobinSet<Address>,
    writers: RoundRobinSet<Address>,
}

/// A driver created from a `bolt+routing` URI, dispatching sessions across
/// the members of a cluster by access mode.
pub struct RoutingDriver {
    encrypted: bool,
    pool: Arc<ConnectionPool<BoltStream>>,
    table: Mutex<RoutingTable>,
}

impl RoutingDriver {
    pub(crate) fn new(address: Address, config: Config) -> Result<Self, ClientError> {
        let plan = SecurityPlan::build(&config)?;
        if !plan.routing_compatible() {
            return Err(ClientError::Configuration(String::from(
                "trust on first use is not compatible with routing",
            )));
        }
        let encrypted = plan.encrypted();
        let pool = Arc::new(ConnectionPool::new(make_connector(plan, config)));

        let mut routers = RoundRobinSet::new();
        routers.add(address);
        let driver = Self {
            encrypted,
            pool,
            table: Mutex::new(RoutingTable {
                routers,
                readers: RoundRobinSet::new(),
                writers: RoundRobinSet::new(),
            }),
        };
        driver.discover()?;
        Ok(driver)
    }

    /// Whether connections made by this driver are encrypted.
    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    /// Refreshes the reader and writer sets from the next router in
    /// rotation.
    pub fn discover(&self) -> Result<(), ClientError> {
        let mut table = self.table();
        let address = table.routers.next().ok_or_else(|| {
            ClientError::Protocol(String::from("no routers are known to this driver"))
        })?;
        // TODO: fetch the actual routing table from the contacted router
        // (the `dbms.cluster.routing.getServers` procedure) instead of
        // promoting it to sole reader and writer.
        table.readers.clear();
        table.readers.add(address.clone());
        table.writers.clear();
        table.writers.add(address);
        Ok(())
    }

    /// Creates a new session on the next reader or writer, depending on the
    /// access mode.
    pub fn session(&self, access_mode: AccessMode) -> Result<Session, ClientError> {
        let address = {
            let mut table = self.table();
            match access_mode {
                AccessMode::Read => table.readers.next(),
                AccessMode::Write => table.writers.next(),
            }
        }
        .ok_or_else(|| {
            ClientError::Protocol(String::from("no servers are known to this driver"))
        })?;
        let connection = self.pool.acquire(&address)?;
        Ok(Session::new(connection, self.pool.clone()))
    }

    /// Closes every pooled connection. Idempotent.
    pub fn close(&self) {
        self.pool.close();
    }

    fn table(&self) -> MutexGuard<'_, RoutingTable> {
        self.table.lock().expect("routing table lock poisoned")
    }
}

impl Drop for RoutingDriver {
    fn drop(&mut self) {
        self.close();
    }
}

//! # bolt-client
//!
//! A blocking client for graph databases speaking version 1 of the Bolt
//! protocol over TCP, optionally wrapped in TLS.
//!
//! The entry point is [`GraphDatabase::driver`], which parses a `bolt` or
//! `bolt+routing` URI into a [`Driver`]. A driver is a thread-safe session
//! factory backed by a connection pool; a [`Session`] runs statements over
//! one pooled connection, either auto-committed or inside an explicit
//! [`Transaction`].
//!
//! ```no_run
//! use bolt_client::{basic_auth, AccessMode, ConfigBuilder, GraphDatabase};
//!
//! let config = ConfigBuilder::new()
//!     .auth(basic_auth("neo4j", "password"))
//!     .build();
//! let driver = GraphDatabase::driver("bolt://localhost", config)?;
//!
//! let mut session = driver.session(AccessMode::Read)?;
//! let mut result = session.run("UNWIND range(1, 3) AS n RETURN n", None)?;
//! while let Some(record) = result.next_record()? {
//!     println!("{:?}", record["n"]);
//! }
//! session.close()?;
//! driver.close();
//! # Ok::<(), bolt_client::ClientError>(())
//! ```

#![cfg_attr(feature = "docsrs", feature(doc_auto_cfg))]
#![warn(missing_docs)]

use url::Url;

mod config;
mod connection;
mod driver;
mod error;
mod pool;
mod record;
mod result;
mod routing;
mod security;
mod session;
mod stream;
mod transaction;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{basic_auth, AuthToken, Config, ConfigBuilder, Trust};
pub use connection::{connect, Address, Connection, Outcome, Response};
pub use driver::{AccessMode, DirectDriver, Driver, RoutingDriver};
pub use error::ClientError;
pub use pool::{ConnectionPool, Connector};
pub use record::Record;
pub use result::{ResultSummary, StatementResult};
pub use security::SecurityPlan;
pub use session::Session;
pub use stream::BoltStream;
pub use transaction::Transaction;

// reexported for ease of access
pub use bolt_protocol as protocol;
pub use bolt_protocol::{Map, Value};

/// The well-known Bolt port, used when a URI does not specify one.
pub const DEFAULT_PORT: u16 = 7687;

/// Provides access to all graph database functionality; primarily used to
/// construct a [`Driver`] instance via [`GraphDatabase::driver`].
pub struct GraphDatabase;

impl GraphDatabase {
    /// Acquires a [`Driver`] for the given URI and configuration.
    ///
    /// `bolt://host[:port]` URIs produce a [`DirectDriver`] addressing a
    /// single server; `bolt+routing://host[:port]` URIs produce a
    /// [`RoutingDriver`] dispatching sessions across a cluster. Any other
    /// scheme is rejected.
    pub fn driver(uri: &str, config: Config) -> Result<Driver, ClientError> {
        let parsed = Url::parse(uri)
            .map_err(|err| ClientError::Protocol(format!("invalid URI [{uri}]: {err}")))?;
        match parsed.scheme() {
            "bolt" => {
                let address = parse_address(&parsed, uri)?;
                Ok(Driver::Direct(DirectDriver::new(address, config)?))
            }
            "bolt+routing" => {
                let address = parse_address(&parsed, uri)?;
                Ok(Driver::Routing(RoutingDriver::new(address, config)?))
            }
            _ => Err(ClientError::Protocol(format!(
                "only the 'bolt' URI scheme is supported [{uri}]"
            ))),
        }
    }
}

fn parse_address(parsed: &Url, uri: &str) -> Result<Address, ClientError> {
    let host = parsed
        .host_str()
        .ok_or_else(|| ClientError::Protocol(format!("no host in URI [{uri}]")))?;
    Ok(Address::new(host, parsed.port().unwrap_or(DEFAULT_PORT)))
}

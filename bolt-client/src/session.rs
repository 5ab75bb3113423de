//! Sessions: a serial sequence of statements over one pooled connection.

use std::io::{Read, Write};
use std::sync::Arc;

use bolt_protocol::message::Request;
use bolt_protocol::Map;

use crate::connection::{Address, Connection, Outcome, Response};
use crate::error::ClientError;
use crate::pool::ConnectionPool;
use crate::result::StatementResult;
use crate::stream::BoltStream;
use crate::transaction::Transaction;


/// A logical session carried out over a connection borrowed from a driver's
/// pool.
///
/// A session is a single-owner object: the borrow checker keeps a running
/// [`StatementResult`] or an open [`Transaction`] exclusive, so statements
/// cannot interleave on the underlying connection. Closing the session
/// drains any outstanding replies and returns the connection to the pool.
pub struct Session<S: Read + Write = BoltStream> {
    pub(crate) connection: Option<Connection<S>>,
    pool: Arc<ConnectionPool<S>>,
}

impl<S: Read + Write> Session<S> {
    pub(crate) fn new(connection: Connection<S>, pool: Arc<ConnectionPool<S>>) -> Self {
        Self {
            connection: Some(connection),
            pool,
        }
    }

    /// The address of the connection this session holds, while it is open.
    pub fn address(&self) -> Option<&Address> {
        self.connection.as_ref().map(Connection::address)
    }

    /// Runs a statement in an auto-commit transaction, returning its
    /// streamed result.
    ///
    /// While a [`Transaction`] is open, the session is mutably borrowed by
    /// it, so auto-commit statements cannot be submitted alongside it:
    ///
    /// ```compile_fail
    /// # use bolt_client::Session;
    /// # fn demo(session: &mut Session) -> Result<(), bolt_client::ClientError> {
    /// let transaction = session.begin_transaction()?;
    /// session.run("RETURN 1", None)?; // still borrowed by `transaction`
    /// # drop(transaction);
    /// # Ok(())
    /// # }
    /// ```
    pub fn run(
        &mut self,
        statement: &str,
        parameters: Option<Map>,
    ) -> Result<StatementResult<'_, S>, ClientError> {
        let connection = self.connection.as_mut().ok_or(ClientError::SessionClosed)?;
        run_statement(connection, statement, parameters.unwrap_or_default())
    }

    /// Begins an explicit transaction on this session.
    pub fn begin_transaction(&mut self) -> Result<Transaction<'_, S>, ClientError> {
        Transaction::begin(self)
    }

    /// Closes the session: drains any outstanding replies and returns the
    /// connection to the pool. Idempotent.
    pub fn close(&mut self) -> Result<(), ClientError> {
        match self.connection.take() {
            Some(mut connection) => {
                let drained = if !connection.closed() && !connection.defunct() {
                    connection.fetch_all().map(drop)
                } else {
                    Ok(())
                };
                // the connection goes back even when draining failed; the
                // pool discards it if it came back defunct
                self.pool.release(connection);
                drained
            }
            None => Ok(()),
        }
    }
}

impl<S: Read + Write> Drop for Session<S> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Runs a statement on a connection: pipelines RUN and PULL_ALL, flushes,
/// and returns the streamed result immediately.
pub(crate) fn run_statement<'connection, S: Read + Write>(
    connection: &'connection mut Connection<S>,
    statement: &str,
    parameters: Map,
) -> Result<StatementResult<'connection, S>, ClientError> {
    let run_response = Response::new();
    let pull_all_response = Response::new();
    connection.append(
        Request::Run {
            statement: statement.to_owned(),
            parameters: parameters.clone(),
        },
        run_response.clone(),
    )?;
    connection.append(Request::PullAll, pull_all_response.clone())?;
    connection.send()?;
    Ok(StatementResult::new(
        connection,
        run_response,
        pull_all_response,
        statement.to_owned(),
        parameters,
    ))
}

/// Pipelines a statement without waiting for its replies; they are drained
/// by later fetches on the same connection.
pub(crate) fn queue_statement<S: Read + Write>(
    connection: &mut Connection<S>,
    statement: &str,
) -> Result<(), ClientError> {
    connection.append(
        Request::Run {
            statement: statement.to_owned(),
            parameters: Map::new(),
        },
        Response::new(),
    )?;
    connection.append(Request::PullAll, Response::new())?;
    connection.send()
}

/// Runs a statement and blocks until its replies arrive, surfacing a server
/// failure as an error.
pub(crate) fn run_synced<S: Read + Write>(
    connection: &mut Connection<S>,
    statement: &str,
) -> Result<(), ClientError> {
    let run_response = Response::new();
    let pull_all_response = Response::new();
    connection.append(
        Request::Run {
            statement: statement.to_owned(),
            parameters: Map::new(),
        },
        run_response.clone(),
    )?;
    connection.append(Request::PullAll, pull_all_response.clone())?;
    connection.send()?;
    while !pull_all_response.is_complete() {
        connection.fetch()?;
    }
    for response in [run_response, pull_all_response] {
        match response.outcome() {
            Some(Outcome::Failure) => {
                return Err(ClientError::cypher(response.metadata().unwrap_or_default()));
            }
            Some(Outcome::Ignored) => {
                return Err(ClientError::Protocol(format!(
                    "{statement} was ignored by the server because of an earlier failure"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

//! Explicit transactions delimited by BEGIN and COMMIT/ROLLBACK.

use std::io::{Read, Write};

use bolt_protocol::Map;

use crate::error::ClientError;
use crate::result::StatementResult;
use crate::session::{queue_statement, run_statement, run_synced, Session};
use crate::stream::BoltStream;

#[cfg(test)]
mod tests;

/// A container for multiple statements executed within a single context.
///
/// The transaction mutably borrows its session for as long as it lives, so
/// no other statement can run on the session until it completes. Dropping a
/// transaction that was neither committed nor rolled back sends a ROLLBACK,
/// so a scope left early (for example with `?`) commits nothing.
pub struct Transaction<'session, S: Read + Write = BoltStream> {
    session: &'session mut Session<S>,
    success: bool,
    closed: bool,
}

impl<'session, S: Read + Write> Transaction<'session, S> {
    /// Opens a transaction by pipelining a BEGIN on the session's
    /// connection.
    pub(crate) fn begin(
        session: &'session mut Session<S>,
    ) -> Result<Transaction<'session, S>, ClientError> {
        let connection = session
            .connection
            .as_mut()
            .ok_or(ClientError::SessionClosed)?;
        queue_statement(connection, "BEGIN")?;
        Ok(Self {
            session,
            success: false,
            closed: false,
        })
    }

    /// Runs a statement within the context of this transaction.
    pub fn run(
        &mut self,
        statement: &str,
        parameters: Option<Map>,
    ) -> Result<StatementResult<'_, S>, ClientError> {
        if self.closed {
            return Err(ClientError::TransactionClosed);
        }
        let connection = self
            .session
            .connection
            .as_mut()
            .ok_or(ClientError::SessionClosed)?;
        run_statement(connection, statement, parameters.unwrap_or_default())
    }

    /// Marks this transaction as successful and closes it, sending a
    /// COMMIT.
    pub fn commit(&mut self) -> Result<(), ClientError> {
        self.success = true;
        self.close()
    }

    /// Marks this transaction as unsuccessful and closes it, sending a
    /// ROLLBACK.
    pub fn rollback(&mut self) -> Result<(), ClientError> {
        self.success = false;
        self.close()
    }

    /// Closes this transaction, sending either a COMMIT or a ROLLBACK and
    /// waiting for the server to confirm it.
    pub fn close(&mut self) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::TransactionClosed);
        }
        self.closed = true;
        let connection = self
            .session
            .connection
            .as_mut()
            .ok_or(ClientError::SessionClosed)?;
        let statement = if self.success { "COMMIT" } else { "ROLLBACK" };
        run_synced(connection, statement)
    }
}

impl<S: Read + Write> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

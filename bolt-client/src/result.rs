//! Lazy, single-pass access to the records of one executed statement.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::Arc;

use bolt_protocol::graph;
use bolt_protocol::{Map, Value};

use crate::connection::{Connection, Outcome, Response};
use crate::error::ClientError;
use crate::record::Record;
use crate::stream::BoltStream;


/// Metadata the server attaches to a completed result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    /// The statement text that produced the result.
    pub statement: String,

    /// The parameters the statement ran with.
    pub parameters: Map,

    /// The kind of statement that ran: `r`, `w`, `rw` or `s`.
    pub statement_type: Option<String>,

    /// Update counters reported by the server.
    pub counters: Map,

    /// The raw metadata map of the result footer.
    pub metadata: Map,
}

impl ResultSummary {
    fn new(statement: String, parameters: Map, metadata: Map) -> Self {
        let statement_type = match metadata.get("type") {
            Some(Value::String(kind)) => Some(kind.clone()),
            _ => None,
        };
        let counters = match metadata.get("stats") {
            Some(Value::Map(stats)) => stats.clone(),
            _ => Map::new(),
        };
        Self {
            statement,
            parameters,
            statement_type,
            counters,
            metadata,
        }
    }
}

/// A handler for the result of statement execution.
///
/// Records are streamed from the server and yielded in arrival order; the
/// stream is single-pass and forward-only. While attached, the result
/// borrows its session's connection, so the session cannot run anything else
/// until the result is dropped or fully buffered.
pub struct StatementResult<'connection, S: Read + Write = BoltStream> {
    connection: Option<&'connection mut Connection<S>>,
    run_response: Response,
    pull_all_response: Response,
    keys: Option<Arc<[String]>>,
    buffer: VecDeque<Vec<Value>>,
    summary: Option<ResultSummary>,
    consumed: bool,
    failure: Option<Map>,
    statement: String,
    parameters: Map,
}

impl<'connection, S: Read + Write> StatementResult<'connection, S> {
    pub(crate) fn new(
        connection: &'connection mut Connection<S>,
        run_response: Response,
        pull_all_response: Response,
        statement: String,
        parameters: Map,
    ) -> Self {
        Self {
            connection: Some(connection),
            run_response,
            pull_all_response,
            keys: None,
            buffer: VecDeque::new(),
            summary: None,
            consumed: false,
            failure: None,
            statement,
            parameters,
        }
    }

    /// The statement text that produced this result.
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// The parameters the statement ran with.
    pub fn parameters(&self) -> &Map {
        &self.parameters
    }

    /// The keys of the records in this result, blocking until the result
    /// header has been received.
    pub fn keys(&mut self) -> Result<Arc<[String]>, ClientError> {
        loop {
            self.absorb();
            if let Some(keys) = &self.keys {
                return Ok(keys.clone());
            }
            if let Some(metadata) = self.failure.take() {
                return Err(ClientError::cypher(metadata));
            }
            if self.consumed {
                return Err(ClientError::Protocol(String::from(
                    "result ended before its header",
                )));
            }
            self.fetch_more()?;
        }
    }

    /// Yields the next record, or `None` once the stream is exhausted.
    ///
    /// A server-reported failure surfaces here, after every record received
    /// ahead of it has been yielded.
    pub fn next_record(&mut self) -> Result<Option<Record>, ClientError> {
        loop {
            self.absorb();
            if let Some(values) = self.buffer.pop_front() {
                return Ok(Some(self.record(values)?));
            }
            if let Some(metadata) = self.failure.take() {
                return Err(ClientError::cypher(metadata));
            }
            if self.consumed {
                self.connection = None;
                return Ok(None);
            }
            self.fetch_more()?;
        }
    }

    /// Returns the next record without removing it from the stream. Fails
    /// with an end-of-stream error if no records remain.
    pub fn peek(&mut self) -> Result<Record, ClientError> {
        loop {
            self.absorb();
            if let Some(values) = self.buffer.front() {
                let values = values.clone();
                return self.record(values);
            }
            if let Some(metadata) = self.failure.take() {
                return Err(ClientError::cypher(metadata));
            }
            if self.consumed {
                return Err(ClientError::EndOfStream);
            }
            self.fetch_more()?;
        }
    }

    /// Materializes the full result and returns its only record, failing
    /// if the result holds no record or more than one.
    pub fn single(&mut self) -> Result<Record, ClientError> {
        let first = match self.next_record()? {
            Some(record) => record,
            None => return Err(ClientError::EmptyResult),
        };
        let mut extra = false;
        while self.next_record()?.is_some() {
            extra = true;
        }
        if extra {
            return Err(ClientError::MultipleRecords);
        }
        Ok(first)
    }

    /// Fetches the remainder of the stream into the internal buffer and
    /// detaches from the connection, so the session can move on without
    /// losing records already received. Idempotent.
    pub fn buffer(&mut self) -> Result<(), ClientError> {
        if self.connection.as_ref().is_some_and(|c| !c.closed()) {
            while !self.consumed {
                self.fetch_more()?;
                self.absorb();
            }
        }
        self.absorb();
        self.connection = None;
        Ok(())
    }

    /// Discards the remainder of this result and returns the summary.
    pub fn consume(&mut self) -> Result<Option<ResultSummary>, ClientError> {
        while self.next_record()?.is_some() {}
        Ok(self.summary.clone())
    }

    /// The result summary, populated once the stream has been consumed.
    pub fn summary(&self) -> Option<&ResultSummary> {
        self.summary.as_ref()
    }

    /// Moves records and completion state out of the response handles.
    fn absorb(&mut self) {
        for values in self.pull_all_response.take_records() {
            self.buffer.push_back(values);
        }

        match self.run_response.outcome() {
            Some(Outcome::Success) => {
                if self.keys.is_none() {
                    let fields = match self.run_response.metadata() {
                        Some(metadata) => match metadata.get("fields") {
                            Some(Value::List(fields)) => fields
                                .iter()
                                .filter_map(|field| match field {
                                    Value::String(name) => Some(name.clone()),
                                    _ => None,
                                })
                                .collect(),
                            _ => Vec::new(),
                        },
                        None => Vec::new(),
                    };
                    self.keys = Some(fields.into());
                }
            }
            Some(Outcome::Failure) => {
                self.consumed = true;
                if self.failure.is_none() {
                    self.failure = self.run_response.metadata();
                }
            }
            _ => {}
        }

        match self.pull_all_response.outcome() {
            Some(Outcome::Success) => {
                if self.summary.is_none() {
                    if let Some(metadata) = self.pull_all_response.metadata() {
                        self.summary = Some(ResultSummary::new(
                            self.statement.clone(),
                            self.parameters.clone(),
                            metadata,
                        ));
                    }
                }
                self.consumed = true;
            }
            Some(Outcome::Failure) => {
                if self.failure.is_none() {
                    self.failure = self.pull_all_response.metadata();
                }
                self.consumed = true;
            }
            Some(Outcome::Ignored) => self.consumed = true,
            None => {}
        }
    }

    fn fetch_more(&mut self) -> Result<(), ClientError> {
        match self.connection.as_deref_mut() {
            Some(connection) => {
                connection.fetch()?;
                self.absorb();
                Ok(())
            }
            None => Err(ClientError::Detached),
        }
    }

    /// Builds a record from raw values, hydrating each into domain values.
    fn record(&self, values: Vec<Value>) -> Result<Record, ClientError> {
        let keys = self.keys.clone().unwrap_or_else(|| Vec::new().into());
        let values = values
            .into_iter()
            .map(graph::hydrate)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Record::new(keys, values))
    }
}

impl<S: Read + Write> Iterator for StatementResult<'_, S> {
    type Item = Result<Record, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

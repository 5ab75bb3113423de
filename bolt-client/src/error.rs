use std::io;

use thiserror::Error;

use bolt_protocol::handshake::HandshakeError;
use bolt_protocol::{DeserializeError, Map, SerializeError, Value};

/// An error during a Bolt exchange.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ClientError {
    /// An error occurred when reading or writing the connection. The
    /// connection that observed it is defunct and will not be reused.
    #[error(transparent)]
    Transport(#[from] io::Error),

    /// The URI, handshake or message stream violated the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The driver configuration was invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The server reported a statement failure.
    #[error("{code}: {message}")]
    Cypher {
        /// The server's failure code.
        code: String,

        /// The server's failure message.
        message: String,

        /// The full metadata map of the failure.
        metadata: Map,
    },

    /// An operation was attempted on a transaction that has already
    /// committed or rolled back.
    #[error("transaction already closed")]
    TransactionClosed,

    /// An operation was attempted on a closed session.
    #[error("session is closed")]
    SessionClosed,

    /// A network operation was attempted on a result that has been detached
    /// from its connection.
    #[error("result is no longer attached to an open connection")]
    Detached,

    /// A single record was requested from a result with no records.
    #[error("cannot retrieve a single record, because this result is empty")]
    EmptyResult,

    /// A single record was requested from a result with more than one record.
    #[error("expected a result with a single record, but this result contains at least one more")]
    MultipleRecords,

    /// The next record was requested when no more records will arrive.
    #[error("end of stream")]
    EndOfStream,

    /// A record was indexed with a key it does not contain.
    #[error("record has no key {0:?}")]
    KeyNotFound(String),

    /// A request could not be serialized.
    #[error(transparent)]
    Serialize(#[from] SerializeError),

    /// A message received from the server could not be deserialized.
    #[error("invalid message received from server: {0}")]
    Deserialize(#[from] DeserializeError),
}

impl ClientError {
    /// Builds the error for a FAILURE summary from its metadata map.
    pub(crate) fn cypher(metadata: Map) -> Self {
        let text = |key: &str| match metadata.get(key) {
            Some(Value::String(text)) => text.clone(),
            _ => String::new(),
        };
        ClientError::Cypher {
            code: text("code"),
            message: text("message"),
            metadata,
        }
    }
}

#[doc(hidden)]
impl From<HandshakeError> for ClientError {
    fn from(value: HandshakeError) -> Self {
        match value {
            HandshakeError::Io(err) => ClientError::Transport(err),
            other => ClientError::Protocol(other.to_string()),
        }
    }
}

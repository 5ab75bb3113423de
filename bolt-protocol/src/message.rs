//! Request and summary messages exchanged with a Bolt server.
//!
//! Every message is a PackStream structure whose signature byte identifies
//! the message type. Clients send [`Request`]s; servers answer with
//! [`Summary`] messages, dispatched against the requests in order.

use num_enum::{IntoPrimitive, TryFromPrimitive, TryFromPrimitiveError};

use crate::packstream::{self, Unpacker};
use crate::{DeserializeError, Map, SerializeError, Value};


/// The signature byte of a protocol message.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
pub enum MessageTag {
    /// Client announcement carrying the user agent and auth token.
    Init = 0x01,

    /// Acknowledgement of a server-reported failure.
    AckFailure = 0x0E,

    /// Request to discard all pending state and return to a ready state.
    Reset = 0x0F,

    /// Statement submission.
    Run = 0x10,

    /// Request to drop all outstanding result records.
    DiscardAll = 0x2F,

    /// Request to stream all outstanding result records.
    PullAll = 0x3F,

    /// Request completed successfully.
    Success = 0x70,

    /// One record of a streamed result.
    Record = 0x71,

    /// Request skipped because an earlier failure is unacknowledged.
    Ignored = 0x7E,

    /// Request failed on the server.
    Failure = 0x7F,
}

#[doc(hidden)]
impl From<TryFromPrimitiveError<MessageTag>> for DeserializeError {
    fn from(value: TryFromPrimitiveError<MessageTag>) -> Self {
        Self::InvalidMessageTag(value.number)
    }
}

/// A client-to-server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Announces the client and authenticates, once per connection.
    Init {
        /// The user agent string identifying the client.
        user_agent: String,

        /// The auth token map (`scheme`, `principal`, `credentials`).
        auth: Map,
    },

    /// Submits a statement with its parameters.
    Run {
        /// The statement text.
        statement: String,

        /// The statement parameters.
        parameters: Map,
    },

    /// Drops all records of the preceding `Run` without streaming them.
    DiscardAll,

    /// Streams all records of the preceding `Run`.
    PullAll,

    /// Acknowledges a failure summary so the connection leaves its failed
    /// state.
    AckFailure,

    /// Returns the connection to a ready state, discarding pending work.
    Reset,
}

impl Request {
    /// The signature byte this request is sent with.
    pub fn tag(&self) -> MessageTag {
        match self {
            Request::Init { .. } => MessageTag::Init,
            Request::Run { .. } => MessageTag::Run,
            Request::DiscardAll => MessageTag::DiscardAll,
            Request::PullAll => MessageTag::PullAll,
            Request::AckFailure => MessageTag::AckFailure,
            Request::Reset => MessageTag::Reset,
        }
    }

    /// Serializes this request onto the end of `buffer` as one unchunked
    /// message payload.
    pub fn pack(&self, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        match self {
            Request::Init { user_agent, auth } => {
                packstream::pack_structure_header(self.tag().into(), 2, buffer)?;
                packstream::pack_string(user_agent, buffer)?;
                packstream::pack_map(auth, buffer)
            }
            Request::Run {
                statement,
                parameters,
            } => {
                packstream::pack_structure_header(self.tag().into(), 2, buffer)?;
                packstream::pack_string(statement, buffer)?;
                packstream::pack_map(parameters, buffer)
            }
            Request::DiscardAll | Request::PullAll | Request::AckFailure | Request::Reset => {
                packstream::pack_structure_header(self.tag().into(), 0, buffer)
            }
        }
    }
}

/// A server-to-client message.
#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    /// The request at the head of the queue completed; carries its metadata.
    Success(Map),

    /// One record of the result stream for the request at the head of the
    /// queue.
    Record(Vec<Value>),

    /// The request at the head of the queue was skipped.
    Ignored(Map),

    /// The request at the head of the queue failed; carries the server's
    /// `code` and `message`.
    Failure(Map),
}

impl Summary {
    /// Deserializes one complete message payload.
    pub fn unpack(payload: &[u8]) -> Result<Self, DeserializeError> {
        let mut unpacker = Unpacker::new(payload);
        let (signature, field_count) = unpacker.unpack_structure_header()?;
        let summary = match MessageTag::try_from(signature)? {
            MessageTag::Success => Summary::Success(unpack_metadata(&mut unpacker, field_count)?),
            MessageTag::Ignored => Summary::Ignored(unpack_metadata(&mut unpacker, field_count)?),
            MessageTag::Failure => Summary::Failure(unpack_metadata(&mut unpacker, field_count)?),
            MessageTag::Record => {
                if field_count != 1 {
                    return Err(DeserializeError::FieldCountMismatch {
                        expected: 1,
                        actual: field_count,
                    });
                }
                match unpacker.unpack_value()? {
                    Value::List(values) => Summary::Record(values),
                    _ => return Err(DeserializeError::WrongFieldType { expected: "list" }),
                }
            }
            _ => return Err(DeserializeError::UnexpectedMessage(signature)),
        };
        if unpacker.remaining() != 0 {
            return Err(DeserializeError::TrailingBytes(unpacker.remaining()));
        }
        Ok(summary)
    }
}

/// SUCCESS/IGNORED/FAILURE carry one metadata map; some servers omit it on
/// IGNORED, in which case an empty map is substituted.
fn unpack_metadata(
    unpacker: &mut Unpacker<'_>,
    field_count: usize,
) -> Result<Map, DeserializeError> {
    match field_count {
        0 => Ok(Map::new()),
        1 => match unpacker.unpack_value()? {
            Value::Map(metadata) => Ok(metadata),
            _ => Err(DeserializeError::WrongFieldType { expected: "map" }),
        },
        actual => Err(DeserializeError::FieldCountMismatch {
            expected: 1,
            actual,
        }),
    }
}

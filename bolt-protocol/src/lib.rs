//! # bolt-protocol
//!
//! Binary format support for version 1 of the Bolt graph database protocol:
//! PackStream value (de)serialization, message chunking and the initial
//! version handshake.
//!
//! This crate only converts between in-memory values and their wire
//! representation. Connection management, sessions and result streaming live
//! in the `bolt-client` crate layered on top of it.

#![warn(missing_docs)]

use core::fmt;

pub mod chunk;
pub mod graph;
pub mod handshake;
pub mod message;
pub mod packstream;

mod value;
pub use value::{Map, Structure, Value};

/// An error that occurred when serializing a value or message into its binary
/// format.
#[non_exhaustive]
#[derive(Debug, PartialEq, Eq)]
pub enum SerializeError {
    /// The length of a string, collection or structure exceeded the maximum
    /// value encodeable on the wire.
    LengthOverflow,

    /// The value has no PackStream representation in a client-to-server
    /// message (e.g. a hydrated graph value).
    UnsupportedValue(&'static str),
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthOverflow => write!(f, "field length overflowed wire encoding"),
            Self::UnsupportedValue(kind) => {
                write!(f, "{kind} values cannot be serialized in a request")
            }
        }
    }
}

impl std::error::Error for SerializeError {}

/// An error that occurred during deserialization of a message payload.
#[non_exhaustive]
#[derive(Debug, PartialEq, Eq)]
pub enum DeserializeError {
    /// Payload was cut off in the middle of a value.
    UnexpectedEnd,

    /// A marker byte did not denote any PackStream type.
    InvalidMarker(u8),

    /// A string field did not hold valid UTF-8.
    BadText,

    /// A map key was not encoded as a string.
    BadKeyType(u8),

    /// A structure signature did not denote any known message.
    InvalidMessageTag(u8),

    /// A structure signature was valid but not a server-to-client message.
    UnexpectedMessage(u8),

    /// A structure held the wrong number of fields.
    FieldCountMismatch {
        /// The number of fields the structure is defined with.
        expected: usize,
        /// The number of fields found on the wire.
        actual: usize,
    },

    /// A structure field held a value of the wrong type.
    WrongFieldType {
        /// The PackStream type the field is defined with.
        expected: &'static str,
    },

    /// Bytes were left over after the end of a message payload.
    TrailingBytes(usize),
}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "payload ended in the middle of a value"),
            Self::InvalidMarker(marker) => write!(f, "invalid marker byte: {marker:#04x}"),
            Self::BadText => write!(f, "string field was not valid UTF-8"),
            Self::BadKeyType(marker) => {
                write!(f, "map key was not a string (marker {marker:#04x})")
            }
            Self::InvalidMessageTag(tag) => write!(f, "invalid message signature: {tag:#04x}"),
            Self::UnexpectedMessage(tag) => {
                write!(f, "message {tag:#04x} is not valid from a server")
            }
            Self::FieldCountMismatch { expected, actual } => write!(
                f,
                "structure field count mismatch: expected {expected}, actual {actual}"
            ),
            Self::WrongFieldType { expected } => {
                write!(f, "structure field was not of the expected type {expected}")
            }
            Self::TrailingBytes(count) => {
                write!(f, "{count} bytes left over after end of message")
            }
        }
    }
}

impl std::error::Error for DeserializeError {}

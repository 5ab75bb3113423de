//! Initial version negotiation with a Bolt server.
//!
//! Immediately after the TCP (or TLS) connection is established, the client
//! sends a fixed four-byte preamble followed by four big-endian u32 protocol
//! version proposals in order of preference. The server answers with the
//! single version it picked, or zero if none of the proposals suit it.

use core::fmt;
use std::io::{self, Read, Write};

use byteorder::{ByteOrder, NetworkEndian};


/// The bytes that open every Bolt connection.
pub const PREAMBLE: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// The protocol version this crate implements.
pub const VERSION: u32 = 1;

/// An error during the version handshake.
#[non_exhaustive]
#[derive(Debug)]
pub enum HandshakeError {
    /// The underlying stream failed while exchanging handshake bytes.
    Io(io::Error),

    /// The server supports none of the proposed protocol versions.
    NoCommonVersion,
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "handshake I/O failure: {err}"),
            Self::NoCommonVersion => {
                write!(f, "server supports none of the proposed protocol versions")
            }
        }
    }
}

impl std::error::Error for HandshakeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::NoCommonVersion => None,
        }
    }
}

#[doc(hidden)]
impl From<io::Error> for HandshakeError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Performs the version handshake on a freshly opened stream, returning the
/// protocol version the server agreed to.
pub fn negotiate<S: Read + Write>(stream: &mut S) -> Result<u32, HandshakeError> {
    let mut request = [0; 20];
    request[..4].copy_from_slice(&PREAMBLE);
    // first proposal slot; the remaining three stay zero
    NetworkEndian::write_u32(&mut request[4..8], VERSION);
    stream.write_all(&request)?;
    stream.flush()?;

    let mut response = [0; 4];
    stream.read_exact(&mut response)?;
    match NetworkEndian::read_u32(&response) {
        0 => Err(HandshakeError::NoCommonVersion),
        version => Ok(version),
    }
}

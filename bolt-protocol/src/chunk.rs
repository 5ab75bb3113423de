//! Message chunking over a byte stream.
//!
//! A Bolt message travels as a sequence of chunks, each prefixed with a
//! big-endian u16 size, terminated by a zero-size end marker. A zero-size
//! chunk outside of a message carries no payload and is skipped.

use std::io::{self, Read};

use byteorder::{NetworkEndian, ReadBytesExt};

#[cfg(test)]
mod tests;

/// The largest payload a single chunk can carry.
pub const MAX_CHUNK_SIZE: usize = 0xFFFF;

/// Appends `payload` to `buffer` as one complete chunked message.
pub fn write_message(buffer: &mut Vec<u8>, payload: &[u8]) {
    for chunk in payload.chunks(MAX_CHUNK_SIZE) {
        buffer.extend_from_slice(&(chunk.len() as u16).to_be_bytes());
        buffer.extend_from_slice(chunk);
    }
    buffer.extend_from_slice(&[0, 0]);
}

/// Reads one complete message from `reader`, blocking until its end marker
/// has been received.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut payload = Vec::new();
    loop {
        let size = usize::from(reader.read_u16::<NetworkEndian>()?);
        if size == 0 {
            if payload.is_empty() {
                // empty chunk between messages, keep waiting
                continue;
            }
            break;
        }
        let start = payload.len();
        payload.resize(start + size, 0);
        reader.read_exact(&mut payload[start..])?;
    }
    Ok(payload)
}

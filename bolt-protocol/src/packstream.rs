//! PackStream v1 value (de)serialization.
//!
//! PackStream is the value encoding carried inside chunked Bolt messages.
//! Each value starts with a marker byte; small strings, lists, maps and
//! structures embed their size in the marker's low nibble, larger ones carry
//! an explicit big-endian size after the marker.

use byteorder::{ByteOrder, NetworkEndian};

use crate::{DeserializeError, Map, SerializeError, Structure, Value};


const NULL: u8 = 0xC0;
const FLOAT_64: u8 = 0xC1;
const FALSE: u8 = 0xC2;
const TRUE: u8 = 0xC3;

const INT_8: u8 = 0xC8;
const INT_16: u8 = 0xC9;
const INT_32: u8 = 0xCA;
const INT_64: u8 = 0xCB;

const TINY_STRING: u8 = 0x80;
const STRING_8: u8 = 0xD0;
const STRING_16: u8 = 0xD1;
const STRING_32: u8 = 0xD2;

const TINY_LIST: u8 = 0x90;
const LIST_8: u8 = 0xD4;
const LIST_16: u8 = 0xD5;
const LIST_32: u8 = 0xD6;

const TINY_MAP: u8 = 0xA0;
const MAP_8: u8 = 0xD8;
const MAP_16: u8 = 0xD9;
const MAP_32: u8 = 0xDA;

const TINY_STRUCT: u8 = 0xB0;
const STRUCT_8: u8 = 0xDC;
const STRUCT_16: u8 = 0xDD;

/// Serializes a single value onto the end of `buffer`.
pub fn pack(value: &Value, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
    match value {
        Value::Null => buffer.push(NULL),
        Value::Boolean(true) => buffer.push(TRUE),
        Value::Boolean(false) => buffer.push(FALSE),
        Value::Integer(i) => pack_integer(*i, buffer),
        Value::Float(f) => {
            buffer.push(FLOAT_64);
            let mut bytes = [0; 8];
            NetworkEndian::write_f64(&mut bytes, *f);
            buffer.extend_from_slice(&bytes);
        }
        Value::String(s) => pack_string(s, buffer)?,
        Value::List(items) => {
            pack_size(TINY_LIST, LIST_8, LIST_16, LIST_32, items.len(), buffer)?;
            for item in items {
                pack(item, buffer)?;
            }
        }
        Value::Map(entries) => pack_map(entries, buffer)?,
        Value::Structure(Structure { signature, fields }) => {
            pack_structure_header(*signature, fields.len(), buffer)?;
            for field in fields {
                pack(field, buffer)?;
            }
        }
        Value::Node(_) => return Err(SerializeError::UnsupportedValue("node")),
        Value::Relationship(_) => return Err(SerializeError::UnsupportedValue("relationship")),
        Value::UnboundRelationship(_) => {
            return Err(SerializeError::UnsupportedValue("relationship"))
        }
        Value::Path(_) => return Err(SerializeError::UnsupportedValue("path")),
    }
    Ok(())
}

/// Serializes a string value onto the end of `buffer`.
pub(crate) fn pack_string(s: &str, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
    pack_size(TINY_STRING, STRING_8, STRING_16, STRING_32, s.len(), buffer)?;
    buffer.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Serializes a map value onto the end of `buffer`.
pub(crate) fn pack_map(entries: &Map, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
    pack_size(TINY_MAP, MAP_8, MAP_16, MAP_32, entries.len(), buffer)?;
    for (key, value) in entries {
        pack_string(key, buffer)?;
        pack(value, buffer)?;
    }
    Ok(())
}

/// Serializes a structure marker and signature onto the end of `buffer`.
/// The caller is expected to follow up with exactly `size` values.
pub(crate) fn pack_structure_header(
    signature: u8,
    size: usize,
    buffer: &mut Vec<u8>,
) -> Result<(), SerializeError> {
    if size < 0x10 {
        buffer.push(TINY_STRUCT | size as u8);
    } else if size <= 0xFF {
        buffer.push(STRUCT_8);
        buffer.push(size as u8);
    } else if size <= 0xFFFF {
        buffer.push(STRUCT_16);
        push_u16(size as u16, buffer);
    } else {
        return Err(SerializeError::LengthOverflow);
    }
    buffer.push(signature);
    Ok(())
}

fn pack_integer(i: i64, buffer: &mut Vec<u8>) {
    if (-16..=127).contains(&i) {
        buffer.push(i as u8);
    } else if i8::try_from(i).is_ok() {
        buffer.push(INT_8);
        buffer.push(i as u8);
    } else if i16::try_from(i).is_ok() {
        buffer.push(INT_16);
        push_u16(i as u16, buffer);
    } else if i32::try_from(i).is_ok() {
        buffer.push(INT_32);
        let mut bytes = [0; 4];
        NetworkEndian::write_i32(&mut bytes, i as i32);
        buffer.extend_from_slice(&bytes);
    } else {
        buffer.push(INT_64);
        let mut bytes = [0; 8];
        NetworkEndian::write_i64(&mut bytes, i);
        buffer.extend_from_slice(&bytes);
    }
}

fn pack_size(
    tiny: u8,
    size_8: u8,
    size_16: u8,
    size_32: u8,
    size: usize,
    buffer: &mut Vec<u8>,
) -> Result<(), SerializeError> {
    if size < 0x10 {
        buffer.push(tiny | size as u8);
    } else if size <= 0xFF {
        buffer.push(size_8);
        buffer.push(size as u8);
    } else if size <= 0xFFFF {
        buffer.push(size_16);
        push_u16(size as u16, buffer);
    } else if u32::try_from(size).is_ok() {
        buffer.push(size_32);
        let mut bytes = [0; 4];
        NetworkEndian::write_u32(&mut bytes, size as u32);
        buffer.extend_from_slice(&bytes);
    } else {
        return Err(SerializeError::LengthOverflow);
    }
    Ok(())
}

fn push_u16(value: u16, buffer: &mut Vec<u8>) {
    let mut bytes = [0; 2];
    NetworkEndian::write_u16(&mut bytes, value);
    buffer.extend_from_slice(&bytes);
}

/// Deserializes exactly one value from `buffer`, failing on leftover bytes.
pub fn unpack(buffer: &[u8]) -> Result<Value, DeserializeError> {
    let mut unpacker = Unpacker::new(buffer);
    let value = unpacker.unpack_value()?;
    if unpacker.remaining() != 0 {
        return Err(DeserializeError::TrailingBytes(unpacker.remaining()));
    }
    Ok(value)
}

/// A cursor over a message payload that deserializes one value at a time.
pub struct Unpacker<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> Unpacker<'a> {
    /// Creates an unpacker positioned at the start of `buffer`.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// The number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// Deserializes the next value.
    pub fn unpack_value(&mut self) -> Result<Value, DeserializeError> {
        let marker = self.take_u8()?;
        match marker {
            0x00..=0x7F => Ok(Value::Integer(i64::from(marker))),
            0xF0..=0xFF => Ok(Value::Integer(i64::from(marker as i8))),
            NULL => Ok(Value::Null),
            TRUE => Ok(Value::Boolean(true)),
            FALSE => Ok(Value::Boolean(false)),
            FLOAT_64 => Ok(Value::Float(NetworkEndian::read_f64(self.take(8)?))),
            INT_8 => Ok(Value::Integer(i64::from(self.take_u8()? as i8))),
            INT_16 => Ok(Value::Integer(i64::from(NetworkEndian::read_i16(
                self.take(2)?,
            )))),
            INT_32 => Ok(Value::Integer(i64::from(NetworkEndian::read_i32(
                self.take(4)?,
            )))),
            INT_64 => Ok(Value::Integer(NetworkEndian::read_i64(self.take(8)?))),
            0x80..=0x8F => self.unpack_string(usize::from(marker & 0x0F)),
            STRING_8 => {
                let size = self.take_size_8()?;
                self.unpack_string(size)
            }
            STRING_16 => {
                let size = self.take_size_16()?;
                self.unpack_string(size)
            }
            STRING_32 => {
                let size = self.take_size_32()?;
                self.unpack_string(size)
            }
            0x90..=0x9F => self.unpack_list(usize::from(marker & 0x0F)),
            LIST_8 => {
                let size = self.take_size_8()?;
                self.unpack_list(size)
            }
            LIST_16 => {
                let size = self.take_size_16()?;
                self.unpack_list(size)
            }
            LIST_32 => {
                let size = self.take_size_32()?;
                self.unpack_list(size)
            }
            0xA0..=0xAF => self.unpack_map(usize::from(marker & 0x0F)),
            MAP_8 => {
                let size = self.take_size_8()?;
                self.unpack_map(size)
            }
            MAP_16 => {
                let size = self.take_size_16()?;
                self.unpack_map(size)
            }
            MAP_32 => {
                let size = self.take_size_32()?;
                self.unpack_map(size)
            }
            0xB0..=0xBF => self.unpack_structure(usize::from(marker & 0x0F)),
            STRUCT_8 => {
                let size = self.take_size_8()?;
                self.unpack_structure(size)
            }
            STRUCT_16 => {
                let size = self.take_size_16()?;
                self.unpack_structure(size)
            }
            _ => Err(DeserializeError::InvalidMarker(marker)),
        }
    }

    /// Deserializes a structure marker, returning its signature and field
    /// count and leaving the cursor on the first field.
    pub fn unpack_structure_header(&mut self) -> Result<(u8, usize), DeserializeError> {
        let marker = self.take_u8()?;
        let size = match marker {
            0xB0..=0xBF => usize::from(marker & 0x0F),
            STRUCT_8 => self.take_size_8()?,
            STRUCT_16 => self.take_size_16()?,
            _ => return Err(DeserializeError::InvalidMarker(marker)),
        };
        let signature = self.take_u8()?;
        Ok((signature, size))
    }

    fn unpack_string(&mut self, size: usize) -> Result<Value, DeserializeError> {
        let bytes = self.take(size)?;
        let text = core::str::from_utf8(bytes).map_err(|_| DeserializeError::BadText)?;
        Ok(Value::String(text.to_owned()))
    }

    fn unpack_list(&mut self, size: usize) -> Result<Value, DeserializeError> {
        let mut items = Vec::with_capacity(size.min(64));
        for _ in 0..size {
            items.push(self.unpack_value()?);
        }
        Ok(Value::List(items))
    }

    fn unpack_map(&mut self, size: usize) -> Result<Value, DeserializeError> {
        let mut entries = Map::new();
        for _ in 0..size {
            let key_marker = self.peek_u8()?;
            let key = match self.unpack_value()? {
                Value::String(key) => key,
                _ => return Err(DeserializeError::BadKeyType(key_marker)),
            };
            entries.insert(key, self.unpack_value()?);
        }
        Ok(Value::Map(entries))
    }

    fn unpack_structure(&mut self, size: usize) -> Result<Value, DeserializeError> {
        let signature = self.take_u8()?;
        let mut fields = Vec::with_capacity(size.min(64));
        for _ in 0..size {
            fields.push(self.unpack_value()?);
        }
        Ok(Value::Structure(Structure { signature, fields }))
    }

    fn take_size_8(&mut self) -> Result<usize, DeserializeError> {
        Ok(usize::from(self.take_u8()?))
    }

    fn take_size_16(&mut self) -> Result<usize, DeserializeError> {
        Ok(usize::from(NetworkEndian::read_u16(self.take(2)?)))
    }

    fn take_size_32(&mut self) -> Result<usize, DeserializeError> {
        let size = NetworkEndian::read_u32(self.take(4)?);
        Ok(size as usize)
    }

    fn peek_u8(&self) -> Result<u8, DeserializeError> {
        self.buffer
            .get(self.position)
            .copied()
            .ok_or(DeserializeError::UnexpectedEnd)
    }

    fn take_u8(&mut self) -> Result<u8, DeserializeError> {
        let byte = self.peek_u8()?;
        self.position += 1;
        Ok(byte)
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], DeserializeError> {
        if self.remaining() < count {
            return Err(DeserializeError::UnexpectedEnd);
        }
        let bytes = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }
}

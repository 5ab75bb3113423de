//! Shared unit-test helpers: scripted streams and server message builders.

use std::io::{self, Cursor, Read, Write};

use bolt_protocol::message::MessageTag;
use bolt_protocol::{chunk, packstream};
use bolt_protocol::{Map, Structure, Value};

use crate::connection::{Address, Connection};

/// A stream that replays scripted server messages and records everything
/// the client writes.
pub(crate) struct ScriptedStream {
    incoming: Cursor<Vec<u8>>,
    pub(crate) outgoing: Vec<u8>,
}

impl ScriptedStream {
    pub(crate) fn replying(messages: &[Vec<u8>]) -> Self {
        Self {
            incoming: Cursor::new(messages.concat()),
            outgoing: Vec::new(),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::replying(&[])
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.incoming.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.outgoing.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) fn address() -> Address {
    Address::new("localhost", 7687)
}

/// A connection over a scripted stream with the given server messages
/// queued for reading.
pub(crate) fn connection(messages: &[Vec<u8>]) -> Connection<ScriptedStream> {
    Connection::new(address(), ScriptedStream::replying(messages))
}

fn message(signature: u8, fields: Vec<Value>) -> Vec<u8> {
    let mut payload = Vec::new();
    packstream::pack(&Value::Structure(Structure { signature, fields }), &mut payload)
        .expect("test message should serialize");
    let mut wire = Vec::new();
    chunk::write_message(&mut wire, &payload);
    wire
}

pub(crate) fn success(metadata: Map) -> Vec<u8> {
    message(MessageTag::Success.into(), vec![Value::Map(metadata)])
}

pub(crate) fn record(values: Vec<Value>) -> Vec<u8> {
    message(MessageTag::Record.into(), vec![Value::List(values)])
}

pub(crate) fn ignored() -> Vec<u8> {
    message(MessageTag::Ignored.into(), vec![Value::Map(Map::new())])
}

pub(crate) fn failure(code: &str, text: &str) -> Vec<u8> {
    let mut metadata = Map::new();
    metadata.insert("code".into(), Value::String(code.to_owned()));
    metadata.insert("message".into(), Value::String(text.to_owned()));
    message(MessageTag::Failure.into(), vec![Value::Map(metadata)])
}

/// RUN success metadata announcing the given record keys.
pub(crate) fn header(keys: &[&str]) -> Map {
    let mut metadata = Map::new();
    metadata.insert(
        "fields".into(),
        Value::List(keys.iter().map(|key| Value::String((*key).into())).collect()),
    );
    metadata
}

/// PULL_ALL success metadata closing a read-only result.
pub(crate) fn footer() -> Map {
    let mut metadata = Map::new();
    metadata.insert("type".into(), Value::String("r".into()));
    metadata
}

/// Splits everything the client wrote into unchunked message payloads.
pub(crate) fn written_messages(outgoing: &[u8]) -> Vec<Vec<u8>> {
    let mut cursor = Cursor::new(outgoing.to_vec());
    let mut messages = Vec::new();
    while (cursor.position() as usize) < outgoing.len() {
        messages.push(chunk::read_message(&mut cursor).expect("written bytes should dechunk"));
    }
    messages
}

/// The signature byte of an unchunked message payload.
pub(crate) fn tag_of(payload: &[u8]) -> u8 {
    payload[1]
}

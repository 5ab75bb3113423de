//! A scripted in-process Bolt server for end-to-end tests.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use bolt_client::protocol::handshake::PREAMBLE;
use bolt_client::protocol::{chunk, packstream};
use bolt_client::protocol::{Map, Structure, Value};

/// One request/reply step: read `expect` chunked messages from the client,
/// then write `reply` back verbatim.
pub struct Turn {
    pub expect: usize,
    pub reply: Vec<u8>,
}

impl Turn {
    pub fn new(expect: usize, replies: &[Vec<u8>]) -> Self {
        Self {
            expect,
            reply: replies.concat(),
        }
    }
}

/// A single-connection Bolt server that performs the version handshake,
/// answers INIT, then plays through the scripted turns.
pub struct StubServer {
    pub port: u16,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub fn start(turns: Vec<Turn>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("stub server should bind");
        let port = listener.local_addr().expect("bound address").port();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("client should connect");
            handshake(&mut stream);

            // INIT and its SUCCESS reply
            read_messages(&mut stream, 1);
            write_reply(&mut stream, &success(server_metadata()));

            for turn in turns {
                read_messages(&mut stream, turn.expect);
                write_reply(&mut stream, &turn.reply);
            }
        });

        Self { port, handle }
    }

    pub fn uri(&self) -> String {
        format!("bolt://127.0.0.1:{}", self.port)
    }

    pub fn join(self) {
        self.handle.join().expect("stub server should not panic");
    }
}

fn handshake(stream: &mut TcpStream) {
    let mut request = [0; 20];
    stream
        .read_exact(&mut request)
        .expect("handshake request should arrive");
    assert_eq!(&request[..4], &PREAMBLE);
    stream
        .write_all(&[0, 0, 0, 1])
        .expect("handshake reply should send");
}

fn read_messages(stream: &mut TcpStream, count: usize) {
    for _ in 0..count {
        chunk::read_message(stream).expect("client message should arrive");
    }
}

fn write_reply(stream: &mut TcpStream, reply: &[u8]) {
    stream.write_all(reply).expect("reply should send");
    stream.flush().expect("reply should flush");
}

fn message(signature: u8, fields: Vec<Value>) -> Vec<u8> {
    let mut payload = Vec::new();
    packstream::pack(&Value::Structure(Structure { signature, fields }), &mut payload)
        .expect("reply message should serialize");
    let mut wire = Vec::new();
    chunk::write_message(&mut wire, &payload);
    wire
}

pub fn success(metadata: Map) -> Vec<u8> {
    message(0x70, vec![Value::Map(metadata)])
}

pub fn record(values: Vec<Value>) -> Vec<u8> {
    message(0x71, vec![Value::List(values)])
}

fn server_metadata() -> Map {
    let mut metadata = Map::new();
    metadata.insert("server".into(), Value::String("Neo4j/3.0.0".into()));
    metadata
}

pub fn header(keys: &[&str]) -> Map {
    let mut metadata = Map::new();
    metadata.insert(
        "fields".into(),
        Value::List(keys.iter().map(|key| Value::String((*key).into())).collect()),
    );
    metadata
}

pub fn footer() -> Map {
    let mut metadata = Map::new();
    metadata.insert("type".into(), Value::String("r".into()));
    metadata
}

//! A single Bolt connection: framed request pipelining and ordered response
//! dispatch.
//!
//! Requests are serialized into an outbound buffer and flushed in one batch
//! by [`Connection::send`]; a [`Response`] handle is queued for each of them.
//! Inbound messages are dispatched strictly in request order: RECORD
//! messages accumulate on the response at the head of the queue, a terminal
//! SUCCESS/IGNORED/FAILURE completes it and pops it.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read, Write};
use std::mem;
use std::net::TcpStream;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use bolt_protocol::chunk;
use bolt_protocol::handshake;
use bolt_protocol::message::{Request, Summary};
use bolt_protocol::{Map, Value};

use crate::config::{Config, DEFAULT_USER_AGENT};
use crate::error::ClientError;
use crate::security::SecurityPlan;
use crate::stream::BoltStream;


/// The failure code attached to responses that die with their connection.
const TRANSPORT_FAILURE_CODE: &str = "Bolt.TransportError";

/// A host and port identifying a server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    /// The host name or address of the server.
    pub host: String,

    /// The TCP port of the server.
    pub port: u16,
}

impl Address {
    /// Bundles a host and port into an address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The terminal state of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request completed successfully.
    Success,

    /// The request was skipped because of an earlier unacknowledged failure.
    Ignored,

    /// The request failed.
    Failure,
}

/// A handle to the server's reply to one request.
///
/// A response starts out pending, accumulates records while its request is
/// streaming, and completes with an [`Outcome`] and a metadata map once its
/// terminal message arrives. Handles are cheap to clone; the connection and
/// the consumer of the reply share one underlying state.
#[derive(Debug, Clone, Default)]
pub struct Response {
    inner: Arc<Mutex<ResponseInner>>,
}

#[derive(Debug, Default)]
struct ResponseInner {
    records: VecDeque<Vec<Value>>,
    metadata: Option<Map>,
    outcome: Option<Outcome>,
}

impl Response {
    /// Creates a pending response handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// The terminal state of this response, if it has completed.
    pub fn outcome(&self) -> Option<Outcome> {
        self.locked().outcome
    }

    /// Whether a terminal message has been dispatched to this response.
    pub fn is_complete(&self) -> bool {
        self.locked().outcome.is_some()
    }

    /// The metadata map of the terminal message, if it has arrived.
    pub fn metadata(&self) -> Option<Map> {
        self.locked().metadata.clone()
    }

    /// Removes and returns the records dispatched so far, in arrival order.
    pub fn take_records(&self) -> Vec<Vec<Value>> {
        self.locked().records.drain(..).collect()
    }

    fn push_record(&self, values: Vec<Value>) {
        self.locked().records.push_back(values);
    }

    fn complete(&self, outcome: Outcome, metadata: Map) {
        let mut inner = self.locked();
        inner.outcome = Some(outcome);
        inner.metadata = Some(metadata);
    }

    fn locked(&self) -> MutexGuard<'_, ResponseInner> {
        self.inner.lock().expect("response state poisoned")
    }
}

struct Pending {
    response: Response,
    acknowledges_failure: bool,
}

/// One open connection to a server.
pub struct Connection<S: Read + Write = BoltStream> {
    address: Address,
    pub(crate) stream: Option<S>,
    request_buffer: Vec<u8>,
    responses: VecDeque<Pending>,
    defunct: bool,
    server_agent: Option<String>,
}

impl<S: Read + Write> Connection<S> {
    /// Wraps a stream on which the version handshake has already completed.
    pub(crate) fn new(address: Address, stream: S) -> Self {
        Self {
            address,
            stream: Some(stream),
            request_buffer: Vec::new(),
            responses: VecDeque::new(),
            defunct: false,
            server_agent: None,
        }
    }

    /// The address this connection is open to.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Whether this connection has been closed.
    pub fn closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Whether this connection observed a transport failure and must not be
    /// reused.
    pub fn defunct(&self) -> bool {
        self.defunct
    }

    /// The server agent string announced in the INIT reply, if any.
    pub fn server_agent(&self) -> Option<&str> {
        self.server_agent.as_deref()
    }

    /// Serializes one request into the outbound buffer and queues `response`
    /// for its reply. Nothing is written until [`send`](Connection::send).
    pub fn append(&mut self, request: Request, response: Response) -> Result<(), ClientError> {
        self.append_pending(request, response, false)
    }

    fn append_pending(
        &mut self,
        request: Request,
        response: Response,
        acknowledges_failure: bool,
    ) -> Result<(), ClientError> {
        let mut payload = Vec::new();
        request.pack(&mut payload)?;
        chunk::write_message(&mut self.request_buffer, &payload);
        self.responses.push_back(Pending {
            response,
            acknowledges_failure,
        });
        Ok(())
    }

    /// Flushes the outbound buffer to the socket as one write batch.
    pub fn send(&mut self) -> Result<(), ClientError> {
        if self.request_buffer.is_empty() {
            return Ok(());
        }
        let buffer = mem::take(&mut self.request_buffer);
        let stream = self.stream()?;
        if let Err(err) = stream.write_all(&buffer).and_then(|()| stream.flush()) {
            return Err(self.defunct_from(err));
        }
        Ok(())
    }

    /// Blocks until one inbound message has been received and dispatches it
    /// to the response at the head of the queue, returning the number of
    /// messages dispatched.
    pub fn fetch(&mut self) -> Result<usize, ClientError> {
        let payload = match chunk::read_message(self.stream()?) {
            Ok(payload) => payload,
            Err(err) => return Err(self.defunct_from(err)),
        };
        // a framing or encoding violation desynchronizes the stream, so the
        // connection cannot be reused either
        let summary = match Summary::unpack(&payload) {
            Ok(summary) => summary,
            Err(err) => {
                self.mark_defunct();
                return Err(err.into());
            }
        };

        match summary {
            Summary::Record(values) => match self.responses.front() {
                Some(head) => head.response.push_record(values),
                None => {
                    self.mark_defunct();
                    return Err(ClientError::Protocol(String::from(
                        "record received with no outstanding request",
                    )));
                }
            },
            Summary::Success(metadata) => {
                self.pop_head()?.response.complete(Outcome::Success, metadata);
            }
            Summary::Ignored(metadata) => {
                self.pop_head()?.response.complete(Outcome::Ignored, metadata);
            }
            Summary::Failure(metadata) => {
                let head = self.pop_head()?;
                head.response.complete(Outcome::Failure, metadata);
                if head.acknowledges_failure {
                    self.mark_defunct();
                    return Err(ClientError::Protocol(String::from(
                        "could not acknowledge server failure",
                    )));
                }
                // leave the failed state behind so the next request on this
                // connection is not ignored
                self.append_pending(Request::AckFailure, Response::new(), true)?;
                self.send()?;
            }
        }
        Ok(1)
    }

    /// Calls [`fetch`](Connection::fetch) until no responses are
    /// outstanding, returning the total number of messages dispatched.
    pub fn fetch_all(&mut self) -> Result<usize, ClientError> {
        let mut dispatched = 0;
        while !self.responses.is_empty() && !self.closed() && !self.defunct {
            dispatched += self.fetch()?;
        }
        Ok(dispatched)
    }

    /// Returns the connection to a ready state, discarding server-side
    /// pending work, and drains every outstanding response.
    pub fn reset(&mut self) -> Result<(), ClientError> {
        let response = Response::new();
        self.append(Request::Reset, response.clone())?;
        self.send()?;
        while !response.is_complete() {
            self.fetch()?;
        }
        match response.outcome() {
            Some(Outcome::Success) => Ok(()),
            _ => Err(ClientError::Protocol(String::from(
                "failed to reset connection",
            ))),
        }
    }

    /// Closes the socket. Further operations on this connection fail.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            debug!(address = %self.address, "connection closed");
        }
    }

    fn stream(&mut self) -> Result<&mut S, ClientError> {
        if self.defunct {
            return Err(ClientError::Transport(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection is defunct",
            )));
        }
        self.stream.as_mut().ok_or_else(|| {
            ClientError::Transport(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection is closed",
            ))
        })
    }

    /// Marks the connection defunct after a transport failure and fails
    /// every outstanding response with the failure's metadata.
    fn defunct_from(&mut self, err: io::Error) -> ClientError {
        let mut metadata = Map::new();
        metadata.insert(
            "code".into(),
            Value::String(TRANSPORT_FAILURE_CODE.to_owned()),
        );
        metadata.insert("message".into(), Value::String(err.to_string()));
        for pending in mem::take(&mut self.responses) {
            pending
                .response
                .complete(Outcome::Failure, metadata.clone());
        }
        self.mark_defunct();
        ClientError::Transport(err)
    }

    fn mark_defunct(&mut self) {
        self.defunct = true;
        self.close();
    }

    fn pop_head(&mut self) -> Result<Pending, ClientError> {
        match self.responses.pop_front() {
            Some(head) => Ok(head),
            None => {
                self.mark_defunct();
                Err(ClientError::Protocol(String::from(
                    "reply received with no outstanding request",
                )))
            }
        }
    }

    /// Announces the client and authenticates, once per connection.
    fn init(&mut self, config: &Config) -> Result<(), ClientError> {
        let auth = config
            .auth
            .as_ref()
            .map(|token| token.as_map())
            .unwrap_or_default();
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

        let response = Response::new();
        self.append(
            Request::Init {
                user_agent,
                auth,
            },
            response.clone(),
        )?;
        self.send()?;
        while !response.is_complete() {
            self.fetch()?;
        }
        match response.outcome() {
            Some(Outcome::Success) => {
                if let Some(Value::String(agent)) =
                    response.metadata().and_then(|m| m.get("server").cloned())
                {
                    self.server_agent = Some(agent);
                }
                Ok(())
            }
            Some(Outcome::Failure) => {
                Err(ClientError::cypher(response.metadata().unwrap_or_default()))
            }
            _ => Err(ClientError::Protocol(String::from(
                "unexpected reply to INIT",
            ))),
        }
    }
}

/// Opens a socket to `address`, negotiates the protocol version and
/// announces the client, returning a connection ready for requests.
pub fn connect(
    address: &Address,
    plan: &SecurityPlan,
    config: &Config,
) -> Result<Connection<BoltStream>, ClientError> {
    let tcp = TcpStream::connect((address.host.as_str(), address.port))?;
    tcp.set_nodelay(true)?;

    #[cfg(feature = "tls")]
    let mut stream = match plan.tls_config() {
        Some(tls_config) => BoltStream::Tls(Box::new(tls_stream(tcp, address, tls_config)?)),
        None => BoltStream::Plain(tcp),
    };
    // without TLS support compiled in, SecurityPlan::build rejects every
    // encrypted configuration, so plain TCP is the only possibility here
    #[cfg(not(feature = "tls"))]
    let mut stream = BoltStream::Plain(tcp);

    let version = handshake::negotiate(&mut stream)?;
    if version != handshake::VERSION {
        return Err(ClientError::Protocol(format!(
            "server agreed to unsupported protocol version {version}"
        )));
    }

    let mut connection = Connection::new(address.clone(), stream);
    connection.init(config)?;
    debug!(address = %connection.address, server = ?connection.server_agent, "connected");
    Ok(connection)
}

#[cfg(feature = "tls")]
fn tls_stream(
    tcp: TcpStream,
    address: &Address,
    tls_config: &Arc<rustls::ClientConfig>,
) -> Result<rustls::StreamOwned<rustls::ClientConnection, TcpStream>, ClientError> {
    let server_name = rustls::pki_types::ServerName::try_from(address.host.clone())
        .map_err(|_| ClientError::Configuration(format!("invalid host name: {}", address.host)))?;
    let session = rustls::ClientConnection::new(tls_config.clone(), server_name)
        .map_err(|err| ClientError::Configuration(format!("TLS setup failed: {err}")))?;
    Ok(rustls::StreamOwned::new(session, tcp))
}

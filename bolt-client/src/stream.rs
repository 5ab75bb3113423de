//! The byte stream underneath a connection: plain TCP, or TLS over TCP.

use std::io::{self, Read, Write};
use std::net::TcpStream;

#[cfg(feature = "tls")]
use rustls::{ClientConnection, StreamOwned};

/// The stream type used by connections a driver opens.
#[derive(Debug)]
pub enum BoltStream {
    /// An unencrypted TCP stream.
    Plain(TcpStream),

    /// A TLS session over TCP.
    #[cfg(feature = "tls")]
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Read for BoltStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BoltStream::Plain(stream) => stream.read(buf),
            #[cfg(feature = "tls")]
            BoltStream::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for BoltStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            BoltStream::Plain(stream) => stream.write(buf),
            #[cfg(feature = "tls")]
            BoltStream::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            BoltStream::Plain(stream) => stream.flush(),
            #[cfg(feature = "tls")]
            BoltStream::Tls(stream) => stream.flush(),
        }
    }
}

//! Byte transports a session can run over.

use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// A connected duplex byte stream.
///
/// Deadlines are applied by the session, so implementations only move bytes.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    /// Address of the remote end.
    fn remote_addr(&self) -> io::Result<SocketAddr>;
}

impl Transport for TcpStream {
    fn remote_addr(&self) -> io::Result<SocketAddr> {
        self.peer_addr()
    }
}

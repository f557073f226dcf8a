//! TCP command stream to the Operator.
//!
//! Every blocking operation is bounded by the configured timeout, so an
//! unresponsive Operator surfaces as `io::ErrorKind::TimedOut` instead of a
//! hang.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::core::{DEFAULT_COMMAND_TIMEOUT, Transport};

/// TCP implementation of [`Transport`].
#[derive(Debug)]
pub struct TcpTransport {
    /// `None` after `close`.
    stream: Option<TcpStream>,
    peer_addr: SocketAddr,
    timeout: Duration,
}

impl TcpTransport {
    /// Connect to `addr`, giving up after `timeout`.
    pub async fn connect(addr: SocketAddr, timeout: Duration) -> io::Result<Self> {
        TcpTransportBuilder::new().timeout(timeout).connect(addr).await
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream, timeout: Duration) -> io::Result<Self> {
        let peer_addr = stream.peer_addr()?;
        Ok(Self {
            stream: Some(stream),
            peer_addr,
            timeout,
        })
    }

    /// Get the Operator's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the send/receive timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Set the send/receive timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Check if `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn stream_mut(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "stream closed"))
    }
}

fn timed_out(what: &str, timeout: Duration) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("{what} timed out after {timeout:?}"),
    )
}

impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let timeout = self.timeout;
        let stream = self.stream_mut()?;
        tokio::time::timeout(timeout, stream.write_all(data))
            .await
            .map_err(|_| timed_out("send", timeout))?
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = self.timeout;
        let stream = self.stream_mut()?;
        tokio::time::timeout(timeout, stream.read(buf))
            .await
            .map_err(|_| timed_out("receive", timeout))?
    }

    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.stream_mut()?.try_read(buf) {
            Ok(n) => Ok(Some(n)),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            // Best effort: the peer may already be gone.
            let _ = stream.shutdown().await;
        }
    }
}

/// Builder for creating TCP transports with custom options.
#[derive(Debug, Clone)]
pub struct TcpTransportBuilder {
    timeout: Duration,
    nodelay: bool,
}

impl Default for TcpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpTransportBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
            nodelay: true,
        }
    }

    /// Set the connect/send/receive timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable Nagle's algorithm (disabled by default).
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Connect to the given address and create a transport.
    pub async fn connect(self, addr: SocketAddr) -> io::Result<TcpTransport> {
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| timed_out("connect", self.timeout))??;
        stream.set_nodelay(self.nodelay)?;
        TcpTransport::from_stream(stream, self.timeout)
    }
}

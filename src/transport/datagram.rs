//! UDP socket wrapper for the clock synchronization channel.
//!
//! Provides a small interface for sending sync requests and receiving
//! fixed-size responses with an explicit deadline.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::core::SYNC_RESPONSE_SIZE;

/// Default receive buffer size.
///
/// Larger than any valid sync message so oversized datagrams are seen whole
/// and can be rejected by length.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 512;

/// UDP socket used by the sync channel.
#[derive(Debug)]
pub struct SyncSocket {
    /// The underlying UDP socket.
    socket: UdpSocket,
    /// Receive buffer.
    recv_buffer: Vec<u8>,
}

impl SyncSocket {
    /// Create a socket bound to the given address.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        SyncSocketBuilder::new().bind(addr).await
    }

    /// Wrap an existing UDP socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        SyncSocketBuilder::new().from_socket(socket)
    }

    /// Get the local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Connect to a remote address.
    ///
    /// After connecting, `send` can be used instead of `send_to`.
    pub async fn connect(&self, addr: SocketAddr) -> io::Result<()> {
        self.socket.connect(addr).await
    }

    /// Send data to the connected address.
    pub async fn send(&self, data: &[u8]) -> io::Result<usize> {
        self.socket.send(data).await
    }

    /// Send data to a specific address.
    pub async fn send_to(&self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(data, addr).await
    }

    /// Receive one datagram and the sender's address.
    pub async fn recv_from(&mut self) -> io::Result<(&[u8], SocketAddr)> {
        let (len, addr) = self.socket.recv_from(&mut self.recv_buffer).await?;
        Ok((&self.recv_buffer[..len], addr))
    }

    /// Receive one datagram, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when the deadline passes without a datagram.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<&[u8]>> {
        let received = tokio::time::timeout(timeout, self.socket.recv(&mut self.recv_buffer)).await;
        match received {
            Ok(Ok(len)) => Ok(Some(&self.recv_buffer[..len])),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }

    /// Throw away every datagram already queued, without waiting.
    ///
    /// Returns how many were dropped.
    pub fn discard_pending(&mut self) -> io::Result<usize> {
        let mut dropped = 0;
        loop {
            match self.socket.try_recv(&mut self.recv_buffer) {
                Ok(_) => dropped += 1,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(dropped),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Builder for creating sync sockets with custom options.
#[derive(Debug, Clone)]
pub struct SyncSocketBuilder {
    recv_buffer_size: usize,
}

impl Default for SyncSocketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncSocketBuilder {
    /// Create a new socket builder with default options.
    pub fn new() -> Self {
        Self {
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }

    /// Set the receive buffer size (never below one sync response).
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size.max(SYNC_RESPONSE_SIZE + 1);
        self
    }

    /// Bind to the given address and create a socket.
    pub async fn bind(self, addr: SocketAddr) -> io::Result<SyncSocket> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(self.from_socket(socket))
    }

    /// Create a socket from an existing UDP socket.
    pub fn from_socket(self, socket: UdpSocket) -> SyncSocket {
        SyncSocket {
            socket,
            recv_buffer: vec![0u8; self.recv_buffer_size],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_socket_bind() {
        let socket = SyncSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = socket.local_addr().unwrap();
        assert!(addr.port() != 0);
    }

    #[tokio::test]
    async fn test_socket_send_recv() {
        let mut server = SyncSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let server_addr = server.local_addr().unwrap();

        let client = SyncSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        client.connect(server_addr).await.unwrap();

        let data = b"sync request";
        client.send(data).await.unwrap();

        let (received, from) = server.recv_from().await.unwrap();
        assert_eq!(received, data);
        assert_eq!(from, client.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_recv_timeout_expires() {
        let mut socket = SyncSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        let received = socket
            .recv_timeout(Duration::from_millis(20))
            .await
            .unwrap();
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn test_recv_timeout_delivers() {
        let mut listener = SyncSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let sender = SyncSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        sender
            .send_to(b"hello", listener.local_addr().unwrap())
            .await
            .unwrap();
        let received = listener
            .recv_timeout(Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(received, Some(&b"hello"[..]));
    }

    #[tokio::test]
    async fn test_discard_pending() {
        let mut listener = SyncSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let sender = SyncSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let to = listener.local_addr().unwrap();

        assert_eq!(listener.discard_pending().unwrap(), 0);

        sender.send_to(b"old", to).await.unwrap();
        sender.send_to(b"older", to).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(listener.discard_pending().unwrap(), 2);

        sender.send_to(b"new", to).await.unwrap();
        let received = listener
            .recv_timeout(Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(received, Some(&b"new"[..]));
    }

    #[test]
    fn test_socket_builder() {
        let builder = SyncSocketBuilder::new().recv_buffer_size(4096);
        assert_eq!(builder.recv_buffer_size, 4096);

        let builder = SyncSocketBuilder::new().recv_buffer_size(1);
        assert_eq!(builder.recv_buffer_size, SYNC_RESPONSE_SIZE + 1);
    }
}

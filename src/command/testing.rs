//! Scripted in-memory transport for exercising the framer byte by byte.

use std::collections::VecDeque;
use std::io;

use crate::core::Transport;

/// One scripted delivery from the peer.
#[derive(Debug, Clone)]
enum Chunk {
    /// Already queued: visible to `try_recv`.
    Ready(Vec<u8>),
    /// Arrives later: only a blocking `recv` gets it.
    Later(Vec<u8>),
}

/// Transport that replays a fixed script of incoming chunks.
///
/// `recv` on an exhausted script fails with `TimedOut`, like a peer that
/// never answers.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    incoming: VecDeque<Chunk>,
    pub(crate) sent: Vec<u8>,
    pub(crate) closed: bool,
    pub(crate) fail_send: bool,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue bytes that are already available when the framer looks.
    pub(crate) fn ready(mut self, bytes: &[u8]) -> Self {
        self.incoming.push_back(Chunk::Ready(bytes.to_vec()));
        self
    }

    /// Queue bytes that only arrive through a blocking read.
    pub(crate) fn later(mut self, bytes: &[u8]) -> Self {
        self.incoming.push_back(Chunk::Later(bytes.to_vec()));
        self
    }

    /// Queue an orderly close by the peer.
    pub(crate) fn eof(self) -> Self {
        self.later(b"")
    }

    pub(crate) fn push_ready(&mut self, bytes: &[u8]) {
        self.incoming.push_back(Chunk::Ready(bytes.to_vec()));
    }

    pub(crate) fn remaining(&self) -> usize {
        self.incoming.len()
    }

    pub(crate) fn sent_text(&self) -> String {
        String::from_utf8_lossy(&self.sent).into_owned()
    }

    fn deliver(bytes: Vec<u8>, buf: &mut [u8]) -> usize {
        assert!(bytes.len() <= buf.len(), "scripted chunk larger than read buffer");
        buf[..bytes.len()].copy_from_slice(&bytes);
        bytes.len()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        if self.closed || self.fail_send {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.sent.extend_from_slice(data);
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        match self.incoming.pop_front() {
            Some(Chunk::Ready(bytes)) | Some(Chunk::Later(bytes)) => {
                Ok(Self::deliver(bytes, buf))
            }
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "script exhausted")),
        }
    }

    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.incoming.front() {
            Some(Chunk::Ready(_)) => match self.incoming.pop_front() {
                Some(Chunk::Ready(bytes)) => Ok(Some(Self::deliver(bytes, buf))),
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

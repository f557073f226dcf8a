//! Core traits for BCI2000 Remote.
//!
//! These traits are the seams between the protocol engine and the outside
//! world: the byte stream it reads from and the application that answers
//! interactive input requests.

use std::future::Future;
use std::io;

/// A reliable, ordered byte stream to the Operator.
///
/// The framer only ever pulls from the transport; it never assumes
/// line-oriented reads. Implementations bound `send` and `recv` by their own
/// configured timeout and report expiry as `io::ErrorKind::TimedOut`.
///
/// # Example
///
/// ```ignore
/// struct Loopback { pending: VecDeque<Vec<u8>> }
///
/// impl Transport for Loopback {
///     async fn send(&mut self, _data: &[u8]) -> io::Result<()> { Ok(()) }
///
///     async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
///         let chunk = self.pending.pop_front().unwrap_or_default();
///         buf[..chunk.len()].copy_from_slice(&chunk);
///         Ok(chunk.len())
///     }
///
///     fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> { Ok(None) }
///
///     async fn close(&mut self) {}
/// }
/// ```
pub trait Transport: Send {
    /// Write all of `data`.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Wait for the next bytes and copy them into `buf`.
    ///
    /// Returns the number of bytes read; `0` means the peer closed the stream.
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;

    /// Read bytes that are already available without waiting.
    ///
    /// Returns `Ok(None)` if nothing is queued right now.
    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>>;

    /// Close the stream. Further calls fail.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Capability supplied by the embedding application to answer interactive
/// input requests from the Operator.
///
/// Any `FnMut(&str) -> Option<String>` closure is an input handler.
pub trait InputHandler: Send {
    /// Produce a line of input for `prompt`, or `None` to decline.
    fn on_input_requested(&mut self, prompt: &str) -> Option<String>;

    /// Offered every plain response line before it is collected.
    ///
    /// Returns `true` if the line was consumed and must not appear in the
    /// response text.
    fn on_output(&mut self, line: &str) -> bool {
        let _ = line;
        false
    }
}

impl<F> InputHandler for F
where
    F: FnMut(&str) -> Option<String> + Send,
{
    fn on_input_requested(&mut self, prompt: &str) -> Option<String> {
        self(prompt)
    }
}

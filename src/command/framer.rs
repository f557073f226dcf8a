//! Response framing state machine.
//!
//! Turns the raw byte stream that follows a command into one [`Outcome`].
//! The scan pulls bytes from a [`Transport`] and runs through three states:
//!
//! ```text
//!                 input request + reply sent
//!   AccumulatingLine ───────────────────────▶ AwaitingAck
//!        │   ▲                                     │
//!        │   └──────── ack seen in next read ──────┘
//!        │
//!        └── termination tag ──▶ Terminated
//! ```
//!
//! The scan ends once the prompt is the last thing received and the
//! transport has nothing more queued.

use std::collections::VecDeque;
use std::io;

use tracing::{debug, trace, warn};

use super::frame::{Frame, is_prompt};
use super::outcome::Outcome;
use crate::core::{
    ACK_TAG, CommandError, CommandResult, InputHandler, LINE_TERMINATOR, READ_CHUNK_SIZE,
    Transport,
};

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Collecting bytes into the current line.
    AccumulatingLine,
    /// Input was sent; the next read must acknowledge it.
    AwaitingAck,
    /// The Operator announced termination.
    Terminated,
}

/// Per-call scan buffers. A fresh `Scan` is built for every read so no
/// bytes carry over from one exchange into the next.
#[derive(Debug)]
struct Scan {
    state: ScanState,
    /// Received but not yet scanned.
    pending: VecDeque<u8>,
    /// Current, not yet terminated line.
    line: Vec<u8>,
    text: Vec<String>,
    exit_code: Option<i32>,
    last_line_was_prompt: bool,
}

impl Scan {
    fn new() -> Self {
        Self {
            state: ScanState::AccumulatingLine,
            pending: VecDeque::new(),
            line: Vec::new(),
            text: Vec::new(),
            exit_code: None,
            last_line_was_prompt: false,
        }
    }

    fn feed(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes);
    }

    /// Move pending bytes into the line buffer until a line completes.
    fn next_line(&mut self) -> Option<String> {
        while let Some(byte) = self.pending.pop_front() {
            if byte == b'\n' {
                let mut raw = std::mem::take(&mut self.line);
                if raw.last() == Some(&b'\r') {
                    raw.pop();
                }
                return Some(String::from_utf8_lossy(&raw).into_owned());
            }
            self.line.push(byte);
        }
        None
    }

    /// Check if the prompt is the last thing received.
    fn at_prompt(&self) -> bool {
        if self.line.is_empty() {
            self.last_line_was_prompt
        } else {
            is_prompt(&String::from_utf8_lossy(&self.line))
        }
    }

    /// Check the read following an input reply for the acknowledgement.
    ///
    /// Everything up to and including the acknowledgement line is dropped;
    /// whatever follows it is scanned as usual.
    fn consume_ack(&mut self) -> CommandResult<()> {
        debug_assert_eq!(self.state, ScanState::AwaitingAck);

        let bytes: Vec<u8> = self.pending.drain(..).collect();
        let Some(tag_at) = find(&bytes, ACK_TAG.as_bytes()) else {
            return Err(CommandError::MissingAcknowledgement(
                String::from_utf8_lossy(&bytes).into_owned(),
            ));
        };

        if let Some(newline) = bytes[tag_at..].iter().position(|&b| b == b'\n') {
            self.pending.extend(&bytes[tag_at + newline + 1..]);
        }
        self.state = ScanState::AccumulatingLine;
        self.last_line_was_prompt = false;
        Ok(())
    }

    fn finish(self) -> Outcome {
        let response = self.text.join("\n");
        match self.state {
            ScanState::Terminated => Outcome::terminated(response, self.exit_code),
            _ => Outcome::new(response, self.exit_code),
        }
    }
}

/// Reads one framed response per command.
#[derive(Debug, Clone)]
pub struct ResponseFramer {
    chunk_size: usize,
}

impl Default for ResponseFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseFramer {
    /// Create a framer with the default read size.
    pub fn new() -> Self {
        Self {
            chunk_size: READ_CHUNK_SIZE,
        }
    }

    /// Set the size of a single transport read.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Read and classify the response to the command just sent.
    ///
    /// Without a `handler`, any input request from the Operator fails the
    /// call with [`CommandError::UnhandledInputRequest`]. On termination the
    /// transport is closed and a terminal outcome is returned at once.
    pub async fn read<T: Transport>(
        &self,
        transport: &mut T,
        mut handler: Option<&mut dyn InputHandler>,
    ) -> CommandResult<Outcome> {
        let mut scan = Scan::new();
        let mut chunk = vec![0u8; self.chunk_size];

        loop {
            while let Some(line) = scan.next_line() {
                match Frame::classify(&line)? {
                    Frame::InputRequest(prompt) => {
                        let Some(input) = handler
                            .as_deref_mut()
                            .and_then(|h| h.on_input_requested(&prompt))
                        else {
                            warn!(prompt = %prompt, "input requested but no handler supplied a line");
                            return Err(CommandError::UnhandledInputRequest(prompt));
                        };

                        debug!(prompt = %prompt, "answering input request");
                        let mut reply = input.into_bytes();
                        reply.extend_from_slice(LINE_TERMINATOR);
                        transport
                            .send(&reply)
                            .await
                            .map_err(CommandError::TransportLost)?;

                        scan.state = ScanState::AwaitingAck;
                        if scan.pending.is_empty() {
                            let n = recv_chunk(transport, &mut chunk).await?;
                            scan.feed(&chunk[..n]);
                        }
                        scan.consume_ack()?;
                    }
                    Frame::ExitCode(code) => {
                        trace!(code, "exit code");
                        scan.exit_code = Some(code);
                        scan.last_line_was_prompt = false;
                    }
                    Frame::Termination => {
                        debug!("operator is terminating, closing connection");
                        scan.state = ScanState::Terminated;
                        transport.close().await;
                        return Ok(scan.finish());
                    }
                    Frame::Acknowledgement => {
                        trace!("ignoring acknowledgement outside an input exchange");
                    }
                    Frame::PromptOnly => {
                        scan.last_line_was_prompt = true;
                    }
                    Frame::PlainLine(text) => {
                        scan.last_line_was_prompt = false;
                        let consumed = handler.as_deref_mut().is_some_and(|h| h.on_output(&text));
                        if !consumed && !text.trim().is_empty() {
                            trace!(line = %text, "response line");
                            scan.text.push(text);
                        }
                    }
                }
            }

            if scan.at_prompt() {
                // A prompt-looking tail only ends the response if nothing
                // else is already queued behind it.
                match transport.try_recv(&mut chunk) {
                    Ok(Some(n)) if n > 0 => {
                        scan.feed(&chunk[..n]);
                        continue;
                    }
                    Ok(_) => return Ok(scan.finish()),
                    Err(e) => return Err(CommandError::TransportLost(e)),
                }
            }

            let n = recv_chunk(transport, &mut chunk).await?;
            scan.feed(&chunk[..n]);
        }
    }
}

/// Blocking read that treats an orderly close as a lost transport.
async fn recv_chunk<T: Transport>(transport: &mut T, chunk: &mut [u8]) -> CommandResult<usize> {
    match transport.recv(chunk).await {
        Ok(0) => Err(CommandError::TransportLost(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "operator closed the connection",
        ))),
        Ok(n) => Ok(n),
        Err(e) => Err(CommandError::TransportLost(e)),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::ScriptedTransport;
    use crate::core::ErrorKind;

    async fn read(transport: &mut ScriptedTransport) -> CommandResult<Outcome> {
        ResponseFramer::new().read(transport, None).await
    }

    #[tokio::test]
    async fn test_plain_response() {
        let mut transport = ScriptedTransport::new().ready(b"line1\n>\n");

        let outcome = read(&mut transport).await.unwrap();
        assert_eq!(outcome.response(), "line1");
        assert_eq!(outcome.exit_code(), None);
        assert!(!outcome.is_terminated());
    }

    #[tokio::test]
    async fn test_crlf_and_trailing_prompt() {
        let mut transport = ScriptedTransport::new().ready(b"a\r\nb\r\n>");

        let outcome = read(&mut transport).await.unwrap();
        assert_eq!(outcome.response(), "a\nb");
    }

    #[tokio::test]
    async fn test_blank_response() {
        let mut transport = ScriptedTransport::new().ready(b"\r\n>");

        let outcome = read(&mut transport).await.unwrap();
        assert!(outcome.is_blank());
        assert!(outcome.session_succeeded());
    }

    #[tokio::test]
    async fn test_response_spans_reads() {
        let mut transport = ScriptedTransport::new()
            .ready(b"par")
            .later(b"tial\r\n")
            .later(b">");

        let outcome = read(&mut transport).await.unwrap();
        assert_eq!(outcome.response(), "partial");
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn test_does_not_stop_at_prompt_with_bytes_queued() {
        let mut transport = ScriptedTransport::new()
            .ready(b"x\r\n>")
            .ready(b"\r\ny\r\n>");

        let outcome = read(&mut transport).await.unwrap();
        assert_eq!(outcome.response(), "x\ny");
    }

    #[tokio::test]
    async fn test_exit_code_then_prompt() {
        let mut transport = ScriptedTransport::new().ready(b"\\ExitCode 2\r\ndone\r\n>");

        let outcome = read(&mut transport).await.unwrap();
        assert_eq!(outcome.exit_code(), Some(2));
        assert_eq!(outcome.response(), "done");
    }

    #[tokio::test]
    async fn test_malformed_exit_code() {
        let mut transport = ScriptedTransport::new().ready(b"\\ExitCode ?\r\n>");

        let err = read(&mut transport).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }

    #[tokio::test]
    async fn test_termination_returns_immediately() {
        let mut transport = ScriptedTransport::new()
            .ready(b"bye\r\n\\Terminating\r\nleftover\r\n>")
            .later(b"never read\r\n>");

        let outcome = read(&mut transport).await.unwrap();
        assert!(outcome.is_terminated());
        assert_eq!(outcome.response(), "bye");
        assert!(transport.closed);
        assert_eq!(transport.remaining(), 1);
    }

    #[tokio::test]
    async fn test_input_request_without_handler() {
        let mut transport = ScriptedTransport::new().ready(b"\\AwaitingInput:Name?\r\n");

        let err = read(&mut transport).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnhandledInputRequest);
        assert!(transport.sent.is_empty());
    }

    #[tokio::test]
    async fn test_input_request_handler_declines() {
        let mut transport = ScriptedTransport::new().ready(b"\\AwaitingInput:Name?\r\n");
        let mut decline = |_: &str| -> Option<String> { None };

        let err = ResponseFramer::new()
            .read(&mut transport, Some(&mut decline as &mut dyn InputHandler))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::UnhandledInputRequest(ref p) if p == "Name?"));
    }

    #[tokio::test]
    async fn test_input_request_missing_ack() {
        let mut transport = ScriptedTransport::new()
            .ready(b"\\AwaitingInput:Name?\r\n")
            .later(b"something else\r\n>");
        let mut answer = |_: &str| Some("Alice".to_string());

        let err = ResponseFramer::new()
            .read(&mut transport, Some(&mut answer as &mut dyn InputHandler))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
        assert_eq!(transport.sent_text(), "Alice\r\n");
    }

    #[tokio::test]
    async fn test_input_request_acknowledged() {
        let mut transport = ScriptedTransport::new()
            .ready(b"\\AwaitingInput:Name?\r\n")
            .later(b"\\AcknowledgedInput\r\nHello Alice\r\n>");
        let mut answer = |prompt: &str| {
            assert_eq!(prompt, "Name?");
            Some("Alice".to_string())
        };

        let outcome = ResponseFramer::new()
            .read(&mut transport, Some(&mut answer as &mut dyn InputHandler))
            .await
            .unwrap();
        assert_eq!(outcome.response(), "Hello Alice");
        assert_eq!(transport.sent_text(), "Alice\r\n");
    }

    #[tokio::test]
    async fn test_ack_already_buffered() {
        let mut transport = ScriptedTransport::new()
            .ready(b"\\AwaitingInput:Name?\r\n\\AcknowledgedInput\r\nok\r\n>");
        let mut answer = |_: &str| Some("Bob".to_string());

        let outcome = ResponseFramer::new()
            .read(&mut transport, Some(&mut answer as &mut dyn InputHandler))
            .await
            .unwrap();
        assert_eq!(outcome.response(), "ok");
    }

    #[tokio::test]
    async fn test_output_consumed_by_handler() {
        struct Filter(Vec<String>);

        impl InputHandler for Filter {
            fn on_input_requested(&mut self, _prompt: &str) -> Option<String> {
                None
            }

            fn on_output(&mut self, line: &str) -> bool {
                if line.starts_with("log:") {
                    self.0.push(line.to_string());
                    true
                } else {
                    false
                }
            }
        }

        let mut transport = ScriptedTransport::new().ready(b"log: hi\r\nvalue\r\n>");
        let mut filter = Filter(Vec::new());

        let outcome = ResponseFramer::new()
            .read(&mut transport, Some(&mut filter as &mut dyn InputHandler))
            .await
            .unwrap();
        assert_eq!(outcome.response(), "value");
        assert_eq!(filter.0, vec!["log: hi".to_string()]);
    }

    #[tokio::test]
    async fn test_stray_ack_is_not_text() {
        let mut transport = ScriptedTransport::new().ready(b"\\AcknowledgedInput\r\nfalse\r\n>");

        let outcome = read(&mut transport).await.unwrap();
        assert_eq!(outcome.response(), "false");
        assert_eq!(outcome.legacy_code(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_transport_lost() {
        let mut transport = ScriptedTransport::new().ready(b"no prompt yet");

        let err = read(&mut transport).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportLost);
    }

    #[tokio::test]
    async fn test_eof_is_transport_lost() {
        let mut transport = ScriptedTransport::new().ready(b"half").eof();

        let err = read(&mut transport).await.unwrap_err();
        assert!(matches!(err, CommandError::TransportLost(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_consecutive_reads_do_not_leak() {
        let mut transport = ScriptedTransport::new()
            .ready(b"first\r\n>")
            .later(b"second\r\n>");

        let first = read(&mut transport).await.unwrap();
        let second = read(&mut transport).await.unwrap();
        assert_eq!(first.response(), "first");
        assert_eq!(second.response(), "second");
    }

    #[tokio::test]
    async fn test_small_chunks() {
        let mut transport = ScriptedTransport::new();
        for byte in b"abc\r\n\\ExitCode 7\r\n>" {
            transport.push_ready(std::slice::from_ref(byte));
        }

        let outcome = ResponseFramer::new()
            .with_chunk_size(1)
            .read(&mut transport, None)
            .await
            .unwrap();
        assert_eq!(outcome.response(), "abc");
        assert_eq!(outcome.exit_code(), Some(7));
    }
}

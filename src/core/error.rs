//! Error types for BCI2000 Remote.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Coarse classification shared by every error the protocol engine reports.
///
/// Callers branch on this instead of matching concrete variants, since
/// downstream command logic depends on telling protocol failures apart from
/// transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Socket timeout, reset, or closed peer. The connection is no longer live.
    TransportLost,
    /// Malformed or unexpected framing.
    ProtocolViolation,
    /// The Operator asked for input and nobody supplied it.
    UnhandledInputRequest,
    /// A sync round trip got no response in time.
    SyncTimeout,
}

/// Errors on the command channel.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No live connection to send on.
    #[error("not connected to the operator")]
    NotConnected,

    /// Read or write failed; the connection has been dropped.
    #[error("lost connection to the operator: {0}")]
    TransportLost(#[source] io::Error),

    /// Input was sent but the Operator did not acknowledge it.
    #[error("did not receive input acknowledgement, got {0:?}")]
    MissingAcknowledgement(String),

    /// Exit-code tag without a trailing integer.
    #[error("malformed exit code line: {0:?}")]
    MalformedExitCode(String),

    /// Input requested without a handler, or the handler declined.
    #[error("could not handle request for input {0:?}: no input handler supplied a line")]
    UnhandledInputRequest(String),
}

impl CommandError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::NotConnected | CommandError::TransportLost(_) => {
                ErrorKind::TransportLost
            }
            CommandError::MissingAcknowledgement(_) | CommandError::MalformedExitCode(_) => {
                ErrorKind::ProtocolViolation
            }
            CommandError::UnhandledInputRequest(_) => ErrorKind::UnhandledInputRequest,
        }
    }

    /// Check if this error left the connection unusable.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::TransportLost
    }
}

/// Errors on the clock synchronization channel.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No response within the round-trip window.
    #[error("timed out after {0:?} waiting for the time server")]
    Timeout(Duration),

    /// Datagram too short to hold a header.
    #[error("sync message too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum bytes required.
        expected: usize,
        /// Bytes received.
        actual: usize,
    },

    /// Wrong magic number.
    #[error("expected magic {expected:#010x}, got {actual:#010x}")]
    BadMagic {
        /// Protocol magic.
        expected: u32,
        /// Received value.
        actual: u32,
    },

    /// Wrong message type byte.
    #[error("expected message type {expected:#04x}, got {actual:#04x}")]
    UnexpectedType {
        /// Expected type byte.
        expected: u8,
        /// Received type byte.
        actual: u8,
    },

    /// Header was fine but the datagram has the wrong size.
    #[error("expected sync message of length {expected}, got {actual}")]
    BadLength {
        /// Exact size for this message type.
        expected: usize,
        /// Bytes received.
        actual: usize,
    },

    /// Timestamps of a trial run backwards.
    #[error("clock anomaly: {0}")]
    ClockAnomaly(String),

    /// Socket error.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl SyncError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Timeout(_) => ErrorKind::SyncTimeout,
            SyncError::Io(_) => ErrorKind::TransportLost,
            SyncError::TooShort { .. }
            | SyncError::BadMagic { .. }
            | SyncError::UnexpectedType { .. }
            | SyncError::BadLength { .. }
            | SyncError::ClockAnomaly(_) => ErrorKind::ProtocolViolation,
        }
    }
}

/// Top-level BCI2000 Remote errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Command channel error.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Clock synchronization error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The Operator answered, but the answer means failure.
    #[error("command {command:?} failed, check the BCI2000 log for details. Response: {response:?}")]
    CommandFailed {
        /// Command as sent.
        command: String,
        /// Response text.
        response: String,
    },

    /// `is parameter` said no.
    #[error("{0} is not a valid parameter name")]
    InvalidParameter(String),

    /// One or more modules did not start.
    #[error("could not start modules:{0}")]
    ModulesFailed(String),

    /// The response could not be read as the expected value.
    #[error("could not parse response to {command:?} as {expected}: {response:?}")]
    UnparsableResponse {
        /// Command as sent.
        command: String,
        /// Type the response should hold.
        expected: &'static str,
        /// Response text.
        response: String,
    },
}

impl RemoteError {
    /// Protocol-engine classification, if this error came from the engine.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RemoteError::Command(e) => Some(e.kind()),
            RemoteError::Sync(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// Result type for command channel operations.
pub type CommandResult<T> = Result<T, CommandError>;

/// Result type for clock synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for the convenience API.
pub type RemoteResult<T> = Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_kinds() {
        assert_eq!(CommandError::NotConnected.kind(), ErrorKind::TransportLost);
        assert_eq!(
            CommandError::TransportLost(io::Error::from(io::ErrorKind::TimedOut)).kind(),
            ErrorKind::TransportLost
        );
        assert_eq!(
            CommandError::MissingAcknowledgement(String::new()).kind(),
            ErrorKind::ProtocolViolation
        );
        assert_eq!(
            CommandError::MalformedExitCode("\\ExitCode x".into()).kind(),
            ErrorKind::ProtocolViolation
        );
        assert_eq!(
            CommandError::UnhandledInputRequest("name?".into()).kind(),
            ErrorKind::UnhandledInputRequest
        );
    }

    #[test]
    fn test_fatal_errors() {
        assert!(CommandError::NotConnected.is_fatal());
        assert!(!CommandError::MissingAcknowledgement(String::new()).is_fatal());
        assert!(!CommandError::UnhandledInputRequest(String::new()).is_fatal());
    }

    #[test]
    fn test_sync_error_kinds() {
        assert_eq!(
            SyncError::Timeout(Duration::from_millis(5)).kind(),
            ErrorKind::SyncTimeout
        );
        assert_eq!(
            SyncError::BadMagic {
                expected: 1,
                actual: 2
            }
            .kind(),
            ErrorKind::ProtocolViolation
        );
        assert_eq!(
            SyncError::Io(io::Error::from(io::ErrorKind::ConnectionReset)).kind(),
            ErrorKind::TransportLost
        );
    }

    #[test]
    fn test_remote_error_kind_passthrough() {
        let err: RemoteError = CommandError::NotConnected.into();
        assert_eq!(err.kind(), Some(ErrorKind::TransportLost));

        let err = RemoteError::InvalidParameter("Foo".into());
        assert_eq!(err.kind(), None);
        assert_eq!(err.to_string(), "Foo is not a valid parameter name");
    }
}

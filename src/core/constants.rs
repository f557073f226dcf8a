//! Protocol constants for the BCI2000 Operator channels.
//!
//! These values are fixed by the Operator and MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// COMMAND CHANNEL FRAMING
// =============================================================================

/// Single character that ends every Operator response.
pub const PROMPT: &str = ">";

/// Line terminator appended to every command and every input line.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Tag announcing that the Operator is waiting for a line of input.
pub const INPUT_REQUEST_TAG: &str = "\\AwaitingInput:";

/// Tag confirming that a line of input was accepted.
pub const ACK_TAG: &str = "\\AcknowledgedInput";

/// Tag preceding a command's numeric exit code.
pub const EXIT_CODE_TAG: &str = "\\ExitCode";

/// Tag announcing that the Operator is shutting down.
pub const TERMINATION_TAG: &str = "\\Terminating";

/// Size of a single transport read.
pub const READ_CHUNK_SIZE: usize = 1024;

// =============================================================================
// COMMAND CHANNEL DEFAULTS
// =============================================================================

/// Default Operator telnet port.
pub const DEFAULT_OPERATOR_PORT: u16 = 3999;

/// Default send/receive timeout on the command channel.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(1000);

/// Command issued right after connecting.
pub const LAUNCH_DIR_COMMAND: &str = "change directory $BCI2000LAUNCHDIR";

/// Command that asks the Operator to exit.
pub const QUIT_COMMAND: &str = "quit";

// =============================================================================
// CLOCK SYNCHRONIZATION WIRE FORMAT
// =============================================================================

/// Magic number opening every sync message (sent big-endian).
pub const SYNC_MAGIC: u32 = 0xbc12_bc12;

/// Message type: request from the client.
pub const SYNC_TYPE_REQUEST: u8 = 0x01;

/// Message type: response from the Operator's time server.
pub const SYNC_TYPE_RESPONSE: u8 = 0x02;

/// Magic + type.
pub const SYNC_HEADER_SIZE: usize = 4 + 1;

/// Header + listen port (u16 BE).
pub const SYNC_REQUEST_SIZE: usize = SYNC_HEADER_SIZE + 2;

/// Header + receive time + send time (u64 BE each).
pub const SYNC_RESPONSE_SIZE: usize = SYNC_HEADER_SIZE + 8 + 8;

// =============================================================================
// CLOCK SYNCHRONIZATION DEFAULTS
// =============================================================================

/// Local UDP port the time server replies to.
pub const DEFAULT_SYNC_LISTEN_PORT: u16 = 12122;

/// Default wait for a single sync response.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default number of trials per synchronization.
pub const DEFAULT_SYNC_ATTEMPTS: usize = 10;

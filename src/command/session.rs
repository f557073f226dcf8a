//! Command session: one command in, one classified outcome out.
//!
//! A `CommandSession` owns the single connection to the Operator. Sending a
//! command and reading its framed response form one atomic exchange, which
//! `&mut self` enforces; callers that share a session across tasks must wrap
//! it in a mutex.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::framer::ResponseFramer;
use super::outcome::Outcome;
use crate::core::{
    CommandError, CommandResult, DEFAULT_COMMAND_TIMEOUT, DEFAULT_OPERATOR_PORT, InputHandler,
    LINE_TERMINATOR, QUIT_COMMAND, Transport,
};

/// Command channel configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Operator telnet address.
    pub operator_addr: SocketAddr,

    /// Connect, send and receive timeout.
    pub timeout: Duration,

    /// Log `set state` commands and their prompts at debug level.
    pub log_states: bool,

    /// Log prompt-only responses at debug level.
    pub log_prompts: bool,

    /// Send `quit` before closing the connection.
    pub quit_on_disconnect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            operator_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_OPERATOR_PORT)),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            log_states: false,
            log_prompts: false,
            quit_on_disconnect: false,
        }
    }
}

/// What kind of command an exchange carried, for selective logging.
///
/// `set state` commands are sent at high rates during a run, so they and the
/// prompts answering them stay at trace level unless asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    /// The command sets a state variable.
    pub state_set: bool,
}

impl Exchange {
    /// Classify a command before sending it.
    pub fn for_command(command: &str) -> Self {
        Self {
            state_set: command.to_ascii_lowercase().contains("set state"),
        }
    }
}

/// Owner of the connection to the Operator.
pub struct CommandSession<T: Transport> {
    /// `None` once the connection is no longer live.
    transport: Option<T>,
    framer: ResponseFramer,
    input_handler: Option<Box<dyn InputHandler>>,
    log_states: bool,
    log_prompts: bool,
    quit_on_disconnect: bool,
}

impl<T: Transport> std::fmt::Debug for CommandSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSession")
            .field("connected", &self.is_connected())
            .field("input_handler", &self.input_handler.is_some())
            .field("log_states", &self.log_states)
            .field("log_prompts", &self.log_prompts)
            .finish()
    }
}

impl<T: Transport> CommandSession<T> {
    /// Wrap an already connected transport.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, &SessionConfig::default())
    }

    /// Wrap an already connected transport, taking logging options from `config`.
    pub fn with_config(transport: T, config: &SessionConfig) -> Self {
        Self {
            transport: Some(transport),
            framer: ResponseFramer::new(),
            input_handler: None,
            log_states: config.log_states,
            log_prompts: config.log_prompts,
            quit_on_disconnect: config.quit_on_disconnect,
        }
    }

    /// Install the capability that answers interactive input requests.
    pub fn set_input_handler(&mut self, handler: impl InputHandler + 'static) {
        self.input_handler = Some(Box::new(handler));
    }

    /// Remove the input handler; input requests fail from now on.
    pub fn clear_input_handler(&mut self) {
        self.input_handler = None;
    }

    /// Check if the connection is live.
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Get the underlying transport while connected.
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Send one command and read its response.
    ///
    /// A termination announcement drops the connection and is returned as a
    /// successful, terminal outcome. Any error drops the connection too: after
    /// a protocol violation or an unanswered input request the rest of the
    /// response is still in flight, and the Operator may be waiting for input,
    /// so later exchanges could not be framed reliably.
    pub async fn send(&mut self, command: &str) -> CommandResult<Outcome> {
        let exchange = Exchange::for_command(command);
        let Some(transport) = self.transport.as_mut() else {
            return Err(CommandError::NotConnected);
        };

        if exchange.state_set && !self.log_states {
            trace!(command, "sent");
        } else {
            debug!(command, "sent");
        }

        let mut line = Vec::with_capacity(command.len() + LINE_TERMINATOR.len());
        line.extend_from_slice(command.as_bytes());
        line.extend_from_slice(LINE_TERMINATOR);

        let result = match transport.send(&line).await {
            Ok(()) => {
                let handler = self
                    .input_handler
                    .as_deref_mut()
                    .map(|h| -> &mut dyn InputHandler { h });
                self.framer.read(transport, handler).await
            }
            Err(e) => Err(CommandError::TransportLost(e)),
        };

        match &result {
            Ok(outcome) => {
                self.log_outcome(exchange, outcome);
                if outcome.is_terminated() {
                    self.transport = None;
                }
            }
            Err(e) if e.is_fatal() => {
                warn!(command, error = %e, "connection to operator lost");
                self.transport = None;
            }
            Err(e) => {
                warn!(command, error = %e, "out of step with operator, closing connection");
                if let Some(mut transport) = self.transport.take() {
                    transport.close().await;
                }
            }
        }

        result
    }

    /// Ask the Operator to exit.
    ///
    /// Returns `true` when the Operator acknowledged with a blank response or
    /// announced termination.
    pub async fn quit(&mut self) -> CommandResult<bool> {
        let outcome = self.send(QUIT_COMMAND).await?;
        Ok(outcome.is_terminated() || outcome.is_blank())
    }

    /// Close the connection, sending `quit` first if configured to.
    pub async fn disconnect(&mut self) {
        if self.quit_on_disconnect && self.is_connected() {
            if let Err(e) = self.quit().await {
                debug!(error = %e, "quit before disconnect failed");
            }
        }
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
            debug!("disconnected from operator");
        }
    }

    fn log_outcome(&self, exchange: Exchange, outcome: &Outcome) {
        let quiet = if outcome.is_blank() {
            if exchange.state_set {
                !self.log_states
            } else {
                !self.log_prompts
            }
        } else {
            false
        };

        if quiet {
            trace!(
                response = outcome.response(),
                exit_code = ?outcome.exit_code(),
                "received"
            );
        } else {
            debug!(
                response = outcome.response(),
                exit_code = ?outcome.exit_code(),
                terminated = outcome.is_terminated(),
                "received"
            );
        }
    }
}

#[cfg(feature = "transport")]
impl CommandSession<crate::transport::TcpTransport> {
    /// Connect to the Operator and move to the BCI2000 launch directory.
    pub async fn connect(config: &SessionConfig) -> CommandResult<Self> {
        let transport = crate::transport::TcpTransport::connect(config.operator_addr, config.timeout)
            .await
            .map_err(CommandError::TransportLost)?;
        debug!(addr = %config.operator_addr, "connected to operator");

        let mut session = Self::with_config(transport, config);
        session.send(crate::core::LAUNCH_DIR_COMMAND).await?;
        Ok(session)
    }
}

//! Client configuration and builder.

use std::net::SocketAddr;
use std::time::Duration;

use crate::command::SessionConfig;
use crate::core::{RemoteError, RemoteResult};
use crate::sync::SyncConfig;

/// Experiment settings the convenience API applies on the Operator.
#[derive(Debug, Clone)]
pub struct RemoteOptions {
    /// Value for the `SubjectName` parameter.
    pub subject: Option<String>,

    /// Value for the `SubjectSession` parameter.
    pub session: Option<String>,

    /// Value for the `DataDirectory` parameter.
    pub data_directory: Option<String>,

    /// Stop a running system on shutdown.
    pub stop_on_quit: bool,

    /// Commands run right after connecting.
    pub init_commands: Vec<String>,

    /// Events added right after connecting, 32 bits wide, initially 0.
    pub events: Vec<String>,

    /// Time server to synchronize against.
    pub sync: Option<SyncConfig>,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            subject: None,
            session: None,
            data_directory: None,
            stop_on_quit: true,
            init_commands: Vec::new(),
            events: Vec::new(),
            sync: None,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Command channel settings.
    pub session: SessionConfig,

    /// Experiment settings.
    pub options: RemoteOptions,
}

impl ClientConfig {
    /// Check the configuration for values that can never work.
    pub fn validate(&self) -> RemoteResult<()> {
        if self.session.timeout.is_zero() {
            return Err(RemoteError::Config("command timeout must be non-zero".into()));
        }
        if let Some(sync) = &self.options.sync {
            if sync.attempts == 0 {
                return Err(RemoteError::Config(
                    "sync attempts must be at least 1".into(),
                ));
            }
            if sync.timeout.is_zero() {
                return Err(RemoteError::Config("sync timeout must be non-zero".into()));
            }
        }
        Ok(())
    }
}

/// Builder for creating a [`Remote`](super::Remote).
#[derive(Debug, Default)]
pub struct RemoteBuilder {
    config: ClientConfig,
}

impl RemoteBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Operator address.
    pub fn operator_addr(mut self, addr: SocketAddr) -> Self {
        self.config.session.operator_addr = addr;
        self
    }

    /// Set the command timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.session.timeout = timeout;
        self
    }

    /// Log `set state` exchanges at debug level.
    pub fn log_states(mut self, enabled: bool) -> Self {
        self.config.session.log_states = enabled;
        self
    }

    /// Log prompt-only responses at debug level.
    pub fn log_prompts(mut self, enabled: bool) -> Self {
        self.config.session.log_prompts = enabled;
        self
    }

    /// Send `quit` before disconnecting.
    pub fn quit_on_disconnect(mut self, enabled: bool) -> Self {
        self.config.session.quit_on_disconnect = enabled;
        self
    }

    /// Set the subject name.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.config.options.subject = Some(subject.into());
        self
    }

    /// Set the session identifier.
    pub fn session(mut self, session: impl Into<String>) -> Self {
        self.config.options.session = Some(session.into());
        self
    }

    /// Set the data directory.
    pub fn data_directory(mut self, dir: impl Into<String>) -> Self {
        self.config.options.data_directory = Some(dir.into());
        self
    }

    /// Stop a running system on shutdown.
    pub fn stop_on_quit(mut self, enabled: bool) -> Self {
        self.config.options.stop_on_quit = enabled;
        self
    }

    /// Add a command to run after connecting.
    pub fn init_command(mut self, command: impl Into<String>) -> Self {
        self.config.options.init_commands.push(command.into());
        self
    }

    /// Add an event to create after connecting.
    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.config.options.events.push(name.into());
        self
    }

    /// Enable clock synchronization against a time server.
    pub fn sync(mut self, config: SyncConfig) -> Self {
        self.config.options.sync = Some(config);
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> RemoteResult<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build the configuration and connect.
    pub async fn connect(self) -> RemoteResult<super::Remote> {
        let config = self.build()?;
        super::Remote::connect(&config).await
    }
}

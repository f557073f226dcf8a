//! Convenience API over the command channel.
//!
//! `Remote` turns typical experiment control steps into single calls. Each
//! call formats one Operator command, sends it through a [`CommandSession`]
//! and checks the outcome with the session-success rule.

use std::num::NonZeroUsize;
use std::str::FromStr;

use tracing::{debug, info, warn};

use super::config::{ClientConfig, RemoteOptions};
use crate::command::{CommandSession, Outcome};
use crate::core::{InputHandler, RemoteError, RemoteResult, Transport};
use crate::sync::{ClockSynchronizer, SyncChannel};
use crate::transport::TcpTransport;

/// System states the Operator reports for `get system state`.
pub const SYSTEM_STATES: &[&str] = &[
    "unavailable",
    "idle",
    "startup",
    "initialization",
    "resting",
    "suspended",
    "paramsmodified",
    "running",
    "termination",
    "busy",
];

/// A core module to launch, with its command line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    name: String,
    args: Vec<String>,
}

impl ModuleSpec {
    /// Module executable name, e.g. `SignalGenerator`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Add an option. Whitespace is removed and `--` prepended if missing.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `start executable` command for this module.
    ///
    /// `--local` is appended unless an option already names it.
    pub fn command(&self) -> String {
        let mut command = format!("start executable {}", self.name);
        let mut has_local = false;
        for arg in &self.args {
            let mut arg: String = arg.chars().filter(|c| !c.is_whitespace()).collect();
            if !arg.starts_with("--") {
                arg.insert_str(0, "--");
            }
            has_local |= arg.to_ascii_lowercase().contains("--local");
            command.push(' ');
            command.push_str(&arg);
        }
        if !has_local {
            command.push_str(" --local");
        }
        command
    }
}

/// Remote control of a BCI2000 Operator.
#[derive(Debug)]
pub struct Remote<T: Transport = TcpTransport> {
    session: CommandSession<T>,
    options: RemoteOptions,
    synchronizer: Option<ClockSynchronizer<SyncChannel>>,
}

impl Remote<TcpTransport> {
    /// Connect to the Operator and apply the configured options.
    pub async fn connect(config: &ClientConfig) -> RemoteResult<Self> {
        config.validate()?;
        let session = CommandSession::connect(&config.session).await?;
        let mut remote = Self::new(session, config.options.clone());
        remote.apply_options().await?;
        info!(addr = %config.session.operator_addr, "remote connected");
        Ok(remote)
    }
}

impl<T: Transport> Remote<T> {
    /// Wrap an established session.
    pub fn new(session: CommandSession<T>, options: RemoteOptions) -> Self {
        Self {
            session,
            options,
            synchronizer: None,
        }
    }

    /// Re-apply subject, session and data directory, run the init
    /// commands, and add the configured events.
    pub async fn apply_options(&mut self) -> RemoteResult<()> {
        self.apply_subject_parameters().await?;
        for command in self.options.init_commands.clone() {
            self.simple_command(&command).await?;
        }
        for event in self.options.events.clone() {
            self.add_event(&event, 32, 0).await?;
        }
        Ok(())
    }

    /// Current options.
    pub fn options(&self) -> &RemoteOptions {
        &self.options
    }

    /// Underlying command session.
    pub fn session(&self) -> &CommandSession<T> {
        &self.session
    }

    /// Underlying command session, mutably.
    pub fn session_mut(&mut self) -> &mut CommandSession<T> {
        &mut self.session
    }

    /// Check if the connection is live.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Install the capability that answers interactive input requests.
    pub fn set_input_handler(&mut self, handler: impl InputHandler + 'static) {
        self.session.set_input_handler(handler);
    }

    /// Set the subject name, applying it right away when connected.
    pub async fn set_subject(&mut self, subject: impl Into<String>) -> RemoteResult<()> {
        self.options.subject = Some(subject.into());
        let value = self.options.subject.clone();
        self.apply_named_parameter("SubjectName", value.as_deref()).await
    }

    /// Set the session identifier, applying it right away when connected.
    pub async fn set_session(&mut self, session: impl Into<String>) -> RemoteResult<()> {
        self.options.session = Some(session.into());
        let value = self.options.session.clone();
        self.apply_named_parameter("SubjectSession", value.as_deref()).await
    }

    /// Set the data directory, applying it right away when connected.
    pub async fn set_data_directory(&mut self, dir: impl Into<String>) -> RemoteResult<()> {
        self.options.data_directory = Some(dir.into());
        let value = self.options.data_directory.clone();
        self.apply_named_parameter("DataDirectory", value.as_deref()).await
    }

    /// Send a command and return the raw outcome.
    pub async fn execute(&mut self, command: &str) -> RemoteResult<Outcome> {
        Ok(self.session.send(command).await?)
    }

    /// Send a command and require session-level success.
    pub async fn simple_command(&mut self, command: &str) -> RemoteResult<Outcome> {
        let outcome = self.execute(command).await?;
        if outcome.session_succeeded() {
            Ok(outcome)
        } else {
            Err(RemoteError::CommandFailed {
                command: command.to_string(),
                response: outcome.into_response(),
            })
        }
    }

    /// Set a parameter value.
    pub async fn set_parameter(&mut self, name: &str, value: &str) -> RemoteResult<()> {
        self.simple_command(&format!("set parameter \"{name}\" \"{value}\""))
            .await?;
        Ok(())
    }

    /// Get a parameter value.
    pub async fn get_parameter(&mut self, name: &str) -> RemoteResult<String> {
        let outcome = self.execute(&format!("is parameter \"{name}\"")).await?;
        if outcome.legacy_code() != 1 {
            return Err(RemoteError::InvalidParameter(name.to_string()));
        }
        let outcome = self.execute(&format!("get parameter \"{name}\"")).await?;
        Ok(outcome.trimmed_response().to_string())
    }

    /// Add a state variable.
    pub async fn add_state_variable(
        &mut self,
        name: &str,
        bit_width: u32,
        initial: f64,
    ) -> RemoteResult<()> {
        self.simple_command(&format!("add state \"{name}\" {bit_width} {initial}"))
            .await?;
        Ok(())
    }

    /// Set a state variable.
    pub async fn set_state_variable(&mut self, name: &str, value: f64) -> RemoteResult<()> {
        self.simple_command(&format!("set state \"{name}\" {value}"))
            .await?;
        Ok(())
    }

    /// Get a state variable.
    pub async fn get_state_variable(&mut self, name: &str) -> RemoteResult<f64> {
        self.query(&format!("get state \"{name}\""), "f64").await
    }

    /// Add an event.
    pub async fn add_event(&mut self, name: &str, bit_width: u32, initial: u32) -> RemoteResult<()> {
        self.simple_command(&format!("add event \"{name}\" {bit_width} {initial}"))
            .await?;
        Ok(())
    }

    /// Set an event.
    pub async fn set_event(&mut self, name: &str, value: u32) -> RemoteResult<()> {
        self.simple_command(&format!("set event {name} {value}"))
            .await?;
        Ok(())
    }

    /// Set an event for a single block.
    pub async fn pulse_event(&mut self, name: &str, value: u32) -> RemoteResult<()> {
        self.simple_command(&format!("pulse event {name} {value}"))
            .await?;
        Ok(())
    }

    /// Get an event.
    pub async fn get_event(&mut self, name: &str) -> RemoteResult<i32> {
        self.query(&format!("get event {name}"), "i32").await
    }

    /// Get one sample of the signal.
    pub async fn get_signal(&mut self, channel: u32, element: u32) -> RemoteResult<f64> {
        self.query(&format!("get signal({channel},{element})"), "f64")
            .await
    }

    /// Block until the system reaches `state`.
    ///
    /// Alternatives may be given as `Resting|Initialization`.
    pub async fn wait_for_system_state(&mut self, state: &str) -> RemoteResult<()> {
        self.simple_command(&format!("wait for {state}")).await?;
        Ok(())
    }

    /// Get the system state, e.g. `Running`.
    pub async fn get_system_state(&mut self) -> RemoteResult<String> {
        const COMMAND: &str = "get system state";
        let outcome = self.execute(COMMAND).await?;
        let state = outcome.trimmed_response();
        let lower = state.to_ascii_lowercase();
        if SYSTEM_STATES.iter().any(|known| lower.contains(known)) {
            Ok(state.to_string())
        } else {
            Err(RemoteError::CommandFailed {
                command: COMMAND.to_string(),
                response: outcome.into_response(),
            })
        }
    }

    /// Restart the system and launch the given core modules.
    ///
    /// Every module is attempted; failures are reported together.
    pub async fn startup_modules(&mut self, modules: &[ModuleSpec]) -> RemoteResult<()> {
        self.execute("shutdown system").await?;
        self.execute("startup system localhost").await?;

        let mut errors = String::new();
        for module in modules {
            let outcome = self.execute(&module.command()).await?;
            if outcome.legacy_code() != 1 {
                warn!(module = module.name(), code = outcome.legacy_code(), "module failed to start");
                errors.push_str(&format!("\n{} returned {}", module.name(), outcome.legacy_code()));
            }
        }
        if !errors.is_empty() {
            return Err(RemoteError::ModulesFailed(errors));
        }

        self.wait_for_system_state("Connected").await
    }

    /// Apply parameters and bring the system to `Resting`.
    pub async fn set_config(&mut self) -> RemoteResult<()> {
        self.apply_subject_parameters().await?;
        self.execute("capture messages none warnings errors").await?;
        self.simple_command("set config").await?;
        self.wait_for_system_state("Resting|Initialization").await?;
        self.execute("capture messages none").await?;
        self.execute("get system state").await?;
        self.execute("flush messages").await?;
        Ok(())
    }

    /// Start a run, applying the configuration first if needed.
    pub async fn start(&mut self) -> RemoteResult<()> {
        let state = self.system_state_text().await?;
        if state.contains("running") {
            warn!("system is already running");
        } else if !state.contains("resting") && !state.contains("suspended") {
            self.set_config().await?;
        }
        self.simple_command("start system").await?;
        Ok(())
    }

    /// Stop the current run.
    pub async fn stop(&mut self) -> RemoteResult<()> {
        let state = self.system_state_text().await?;
        if !state.contains("running") {
            warn!("system is not running");
        }
        self.simple_command("stop system").await?;
        Ok(())
    }

    /// Estimate the offset between the local clock and the configured time
    /// server, in ns.
    pub async fn synchronize(&mut self) -> RemoteResult<i64> {
        if self.synchronizer.is_none() {
            let config = self
                .options
                .sync
                .clone()
                .ok_or_else(|| RemoteError::Config("no time server configured".into()))?;
            let attempts = NonZeroUsize::new(config.attempts)
                .ok_or_else(|| RemoteError::Config("sync attempts must be at least 1".into()))?;
            self.synchronizer = Some(ClockSynchronizer::open(&config, attempts).await?);
        }
        let synchronizer = self
            .synchronizer
            .as_mut()
            .ok_or_else(|| RemoteError::Config("no time server configured".into()))?;
        Ok(synchronizer.synchronize().await?)
    }

    /// Stop the system if configured to, then disconnect.
    pub async fn shutdown(&mut self) {
        if self.options.stop_on_quit && self.is_connected() {
            if let Err(e) = self.stop().await {
                debug!(error = %e, "stop on shutdown failed");
            }
        }
        self.session.disconnect().await;
        self.synchronizer = None;
    }

    async fn system_state_text(&mut self) -> RemoteResult<String> {
        let outcome = self.execute("get system state").await?;
        Ok(outcome.response().to_ascii_lowercase())
    }

    async fn query<V: FromStr>(&mut self, command: &str, expected: &'static str) -> RemoteResult<V> {
        let outcome = self.simple_command(command).await?;
        let text = outcome.trimmed_response();
        text.parse().map_err(|_| RemoteError::UnparsableResponse {
            command: command.to_string(),
            expected,
            response: text.to_string(),
        })
    }

    async fn apply_subject_parameters(&mut self) -> RemoteResult<()> {
        let RemoteOptions {
            subject,
            session,
            data_directory,
            ..
        } = self.options.clone();
        self.apply_named_parameter("SubjectName", subject.as_deref())
            .await?;
        self.apply_named_parameter("SubjectSession", session.as_deref())
            .await?;
        self.apply_named_parameter("DataDirectory", data_directory.as_deref())
            .await
    }

    async fn apply_named_parameter(&mut self, name: &str, value: Option<&str>) -> RemoteResult<()> {
        match value {
            Some(value) if !value.is_empty() && self.is_connected() => {
                self.execute(&format!("set parameter {name} \"{value}\""))
                    .await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

//! # BCI2000 Remote
//!
//! Client for remotely controlling a BCI2000 Operator.
//!
//! Two independent channels:
//!
//! - **Command channel**: newline-delimited text commands over TCP. Every
//!   response is framed by the Operator's `>` prompt, with in-band tags for
//!   interactive input, exit codes and termination.
//! - **Clock synchronization**: UDP request/response pairs against a time
//!   server, paired into trials that cancel the path latency.
//!
//! ## Feature Flags
//!
//! - `transport` (default): tokio TCP and UDP sockets
//! - `sync` (default): sync wire format, trial math and synchronizer
//! - `client` (default): the [`Remote`](client::Remote) convenience API
//!
//! ## Modules
//!
//! - [`core`]: Traits, constants, clock, and error types (always included)
//! - [`command`]: Response framing and command sessions (always included)
//! - [`transport`]: Socket implementations (requires `transport` feature)
//! - [`sync`]: Clock synchronization (requires `sync` feature)
//! - [`client`]: High-level API (requires `client` feature)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bci2000_remote::prelude::*;
//!
//! # async fn run() -> RemoteResult<()> {
//! let mut remote = RemoteBuilder::new()
//!     .subject("S01")
//!     .event("Stimulus")
//!     .connect()
//!     .await?;
//!
//! remote
//!     .startup_modules(&[
//!         ModuleSpec::new("SignalGenerator"),
//!         ModuleSpec::new("DummySignalProcessing"),
//!         ModuleSpec::new("DummyApplication"),
//!     ])
//!     .await?;
//! remote.set_parameter("SamplingRate", "256").await?;
//! remote.start().await?;
//! remote.pulse_event("Stimulus", 1).await?;
//! remote.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Command channel (always included)
pub mod command;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Sync layer (feature-gated)
#[cfg(feature = "sync")]
#[cfg_attr(docsrs, doc(cfg(feature = "sync")))]
pub mod sync;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::*;

    pub use crate::command::{CommandSession, Outcome, ResponseFramer, SessionConfig};

    #[cfg(feature = "transport")]
    pub use crate::transport::{SyncSocket, TcpTransport, TcpTransportBuilder};

    #[cfg(feature = "sync")]
    pub use crate::sync::{ClockSynchronizer, RoundTrip, RoundTripTimes, SyncConfig, SyncReport};

    #[cfg(all(feature = "sync", feature = "transport"))]
    pub use crate::sync::SyncChannel;

    #[cfg(feature = "client")]
    pub use crate::client::{ClientConfig, ModuleSpec, Remote, RemoteBuilder, RemoteOptions};
}

// Re-export commonly used items at crate root
pub use crate::command::{CommandSession, Outcome};
pub use crate::core::{CommandError, ErrorKind, RemoteError, SyncError};

#[cfg(feature = "client")]
pub use crate::client::{Remote, RemoteBuilder};

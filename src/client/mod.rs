//! BCI2000 Remote - Client Library
//!
//! High-level API for controlling a BCI2000 Operator: connection setup,
//! parameters, states, events, and run control.

mod config;
mod remote;

pub use config::*;
pub use remote::*;

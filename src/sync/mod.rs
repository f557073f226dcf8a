//! BCI2000 Remote - Clock Synchronization
//!
//! Estimates the offset between the local monotonic clock and a BCI2000
//! time server:
//! - Fixed-size request/response datagrams
//! - Two-round-trip trials, paired so the path latency cancels
//! - Selection of the most symmetric trial

#[cfg(feature = "transport")]
mod channel;
mod message;
mod synchronizer;
mod trial;

#[cfg(feature = "transport")]
pub use channel::*;
pub use message::*;
pub use synchronizer::*;
pub use trial::{RoundTripTimes, SyncTrial, TrialEstimate, select_best};

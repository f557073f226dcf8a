//! BCI2000 Remote - Transport Layer
//!
//! Socket plumbing for both Operator channels:
//!
//! - **Command stream**: [`TcpTransport`], the tokio TCP implementation of
//!   [`Transport`](crate::core::Transport)
//! - **Sync datagrams**: [`SyncSocket`] wrapper for tokio UDP
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐
//! │   Command Session    │   │  Clock Synchronizer  │
//! ├──────────────────────┤   ├──────────────────────┤
//! │    TcpTransport      │   │     SyncSocket       │  ← This module
//! ├──────────────────────┤   ├──────────────────────┤
//! │        TCP           │   │        UDP           │
//! └──────────────────────┘   └──────────────────────┘
//! ```
//!
//! The two channels share no state.

mod datagram;
mod stream;

pub use datagram::*;
pub use stream::*;

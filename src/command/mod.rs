//! BCI2000 Remote - Command Channel
//!
//! This module turns textual commands into classified outcomes:
//!
//! - **Line classification**: [`Frame`] recognizes prompts and in-band tags
//! - **Response framing**: [`ResponseFramer`] runs the scan state machine
//! - **Outcomes**: [`Outcome`] with the session-success rule
//! - **Sessions**: [`CommandSession`] owns the connection and serializes exchanges
//!
//! ```text
//! command ──▶ CommandSession ──▶ Transport ──▶ Operator
//!                   ▲                              │
//!                   └── Outcome ◀── ResponseFramer ◀┘
//! ```

mod frame;
mod framer;
mod outcome;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use frame::{Frame, is_prompt};
pub use framer::ResponseFramer;
pub use outcome::{Outcome, legacy_code};
pub use session::{CommandSession, Exchange, SessionConfig};

//! BCI2000 Remote - Core traits, types, and constants.
//!
//! This module provides the foundational traits and types shared by the
//! command channel and the clock synchronization channel. It has no runtime
//! dependencies.

pub mod clock;
mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;

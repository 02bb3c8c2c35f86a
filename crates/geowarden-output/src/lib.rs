//! # Geowarden Output
//!
//! Relay of recent child output. Reader tasks consume the child's stdout and
//! stderr line by line into a fixed-capacity ring buffer, so the supervisor
//! retains only the most recent N lines no matter how chatty the child is.

pub mod buffer;
pub mod collector;
pub mod types;

pub use buffer::*;
pub use collector::*;
pub use types::*;

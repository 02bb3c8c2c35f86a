//! # Geowarden Common
//!
//! Shared error taxonomy and result alias used by every geowarden crate.

pub mod errors;

pub use errors::*;

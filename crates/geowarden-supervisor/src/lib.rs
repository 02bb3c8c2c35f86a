//! # Geowarden Supervisor
//!
//! The supervisor owns the lifecycle of exactly one external server process:
//! - Lifecycle state machine with an enforced transition table
//! - YAML configuration with validation
//! - The `Supervisor` itself: start/stop/restart/status/output operations

pub mod config;
pub mod state;
pub mod supervisor;
pub mod types;

pub use config::*;
pub use state::*;
pub use supervisor::*;
pub use types::*;

//! Error types for supervisor operations.
//!
//! Every operation-level failure is one of these variants; none of them is
//! allowed to take the supervisor process down. The HTTP layer maps each
//! variant to a stable wire `kind` string plus its display message.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for supervisor operations.
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Error taxonomy for supervisor operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A start request arrived while a managed process is already active.
    #[error("a managed process is already running")]
    AlreadyRunning,

    /// A stop request arrived with no active managed process.
    #[error("no managed process is running")]
    NotRunning,

    /// Spawning the child executable failed (missing binary, bad working
    /// directory, port already bound by a stale instance, ...).
    #[error("failed to launch child process: {reason}")]
    Launch { reason: String },

    /// The child did not exit within the grace period and was force-killed.
    /// Logged by stop(), never returned as an operation failure.
    #[error("child did not exit within the {grace:?} grace period; force-killed")]
    TerminationTimeout { grace: Duration },

    /// A health probe did not complete within its timeout. Surfaced to
    /// callers as an `Unhealthy` status, never as a hard failure.
    #[error("health probe timed out after {timeout:?}: {url}")]
    ProbeTimeout { url: String, timeout: Duration },

    /// The child exited while it was supposed to be running.
    #[error("child process exited unexpectedly (exit code {exit_code:?})")]
    Crashed { exit_code: Option<i32> },

    /// Delivering a termination or liveness signal failed.
    #[error("signal delivery failed: {reason}")]
    Signal { reason: String },

    /// A lifecycle transition that the state machine does not permit.
    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Invalid configuration detected at load time.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// I/O error (wraps std::io::Error).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupervisorError {
    /// Creates a Launch error.
    pub fn launch(reason: impl Into<String>) -> Self {
        Self::Launch {
            reason: reason.into(),
        }
    }

    /// Creates a Signal error.
    pub fn signal(reason: impl Into<String>) -> Self {
        Self::Signal {
            reason: reason.into(),
        }
    }

    /// Creates an InvalidConfig error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Creates an InvalidTransition error.
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Stable wire identifier for the error kind, used by the HTTP layer.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "already_running",
            Self::NotRunning => "not_running",
            Self::Launch { .. } => "launch_failed",
            Self::TerminationTimeout { .. } => "termination_timeout",
            Self::ProbeTimeout { .. } => "probe_timeout",
            Self::Crashed { .. } => "crashed",
            Self::Signal { .. } => "signal_failed",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let err = SupervisorError::launch("executable not found");
        assert!(matches!(err, SupervisorError::Launch { .. }));
        assert_eq!(
            err.to_string(),
            "failed to launch child process: executable not found"
        );
    }

    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(SupervisorError::AlreadyRunning.kind(), "already_running");
        assert_eq!(SupervisorError::NotRunning.kind(), "not_running");
        assert_eq!(
            SupervisorError::Crashed { exit_code: Some(137) }.kind(),
            "crashed"
        );
    }

    #[test]
    fn test_error_pattern_matching() {
        let err = SupervisorError::invalid_transition("stopped", "stopping");

        match err {
            SupervisorError::InvalidTransition { from, to } => {
                assert_eq!(from, "stopped");
                assert_eq!(to, "stopping");
            }
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SupervisorError = io.into();
        assert!(matches!(err, SupervisorError::Io(_)));
    }
}

//! Output relay data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which child stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
        }
    }
}

/// A single retained output line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputLine {
    /// Monotonic sequence number across both streams, starting at 1.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub stream: StreamKind,
    pub line: String,
}

//! Status snapshot types returned by queries.

use crate::state::ProcessState;
use chrono::{DateTime, Utc};
use geowarden_probe::ProbeOutcome;
use serde::{Deserialize, Serialize};

/// Snapshot of the managed process, recomputed on each status query.
/// Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: ProcessState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
    /// Exit code of the child, present when it crashed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_probe: Option<ProbeOutcome>,
    /// Diagnostic message for crashed or unhealthy states
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

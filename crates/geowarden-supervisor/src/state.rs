//! Lifecycle state machine for the managed process.

use chrono::{DateTime, Utc};
use geowarden_common::{Result, SupervisorError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// No child process; ready to accept a start
    Stopped,
    /// Child spawned, not yet confirmed ready
    Starting,
    /// Child alive and passing probes
    Running,
    /// Stop in progress (grace window)
    Stopping,
    /// Child alive but failing health probes; recoverable
    Unhealthy,
    /// Child exited unexpectedly; restart is a caller decision
    Crashed,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Stopped => write!(f, "stopped"),
            ProcessState::Starting => write!(f, "starting"),
            ProcessState::Running => write!(f, "running"),
            ProcessState::Stopping => write!(f, "stopping"),
            ProcessState::Unhealthy => write!(f, "unhealthy"),
            ProcessState::Crashed => write!(f, "crashed"),
        }
    }
}

impl ProcessState {
    /// A child process exists (possibly on its way down).
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ProcessState::Starting
                | ProcessState::Running
                | ProcessState::Stopping
                | ProcessState::Unhealthy
        )
    }

    /// States from which a start request is accepted.
    pub fn can_start(&self) -> bool {
        matches!(self, ProcessState::Stopped | ProcessState::Crashed)
    }

    /// States from which a stop request is accepted.
    pub fn can_stop(&self) -> bool {
        matches!(
            self,
            ProcessState::Starting | ProcessState::Running | ProcessState::Unhealthy
        )
    }
}

/// A recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from_state: ProcessState,
    pub to_state: ProcessState,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// State machine enforcing the lifecycle transition table, with a bounded
/// transition history retained for diagnostics.
#[derive(Debug, Clone)]
pub struct LifecycleMachine {
    current_state: ProcessState,
    previous_state: Option<ProcessState>,
    history: Vec<StateTransition>,
    last_transition_time: DateTime<Utc>,
}

const MAX_HISTORY: usize = 100;

impl LifecycleMachine {
    pub fn new() -> Self {
        Self {
            current_state: ProcessState::Stopped,
            previous_state: None,
            history: Vec::new(),
            last_transition_time: Utc::now(),
        }
    }

    pub fn current_state(&self) -> ProcessState {
        self.current_state
    }

    pub fn previous_state(&self) -> Option<ProcessState> {
        self.previous_state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn last_transition(&self) -> Option<&StateTransition> {
        self.history.last()
    }

    pub fn last_transition_time(&self) -> DateTime<Utc> {
        self.last_transition_time
    }

    /// Check whether the transition table permits moving to `target`.
    pub fn is_valid_transition(&self, target: ProcessState) -> bool {
        use ProcessState::*;

        match (self.current_state, target) {
            (Stopped, Starting) => true,

            (Starting, Running) => true,
            (Starting, Stopping) => true, // cancel an in-flight start
            (Starting, Crashed) => true,

            (Running, Stopping) => true,
            (Running, Unhealthy) => true,
            (Running, Crashed) => true,

            (Unhealthy, Running) => true, // probe recovered
            (Unhealthy, Stopping) => true,
            (Unhealthy, Crashed) => true,

            (Stopping, Stopped) => true,

            (Crashed, Starting) => true, // caller-initiated restart
            (Crashed, Stopped) => true,  // supervisor shutdown

            // Same state is a no-op
            (state, target) if state == target => true,

            _ => false,
        }
    }

    /// Transition to `target`, recording the reason. Rejected transitions
    /// leave the machine untouched.
    pub fn transition_to(&mut self, target: ProcessState, reason: Option<String>) -> Result<()> {
        if !self.is_valid_transition(target) {
            return Err(SupervisorError::invalid_transition(
                self.current_state.to_string(),
                target.to_string(),
            ));
        }

        let now = Utc::now();
        self.history.push(StateTransition {
            from_state: self.current_state,
            to_state: target,
            timestamp: now,
            reason,
        });
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }

        self.previous_state = Some(self.current_state);
        self.current_state = target;
        self.last_transition_time = now;

        tracing::debug!(
            from = %self.previous_state.unwrap(),
            to = %self.current_state,
            "lifecycle transition"
        );

        Ok(())
    }
}

impl Default for LifecycleMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_starts_stopped() {
        let machine = LifecycleMachine::new();
        assert_eq!(machine.current_state(), ProcessState::Stopped);
        assert_eq!(machine.previous_state(), None);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut machine = LifecycleMachine::new();

        machine
            .transition_to(ProcessState::Starting, Some("start requested".into()))
            .unwrap();
        machine
            .transition_to(ProcessState::Running, Some("probe succeeded".into()))
            .unwrap();
        machine
            .transition_to(ProcessState::Stopping, Some("stop requested".into()))
            .unwrap();
        machine
            .transition_to(ProcessState::Stopped, Some("stop completed".into()))
            .unwrap();

        assert_eq!(machine.current_state(), ProcessState::Stopped);
        assert_eq!(machine.history().len(), 4);
        assert_eq!(machine.history()[0].from_state, ProcessState::Stopped);
        assert_eq!(machine.history()[3].to_state, ProcessState::Stopped);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut machine = LifecycleMachine::new();

        // Stopped -> Running skips Starting
        let err = machine
            .transition_to(ProcessState::Running, None)
            .unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidTransition { .. }));
        assert_eq!(machine.current_state(), ProcessState::Stopped);

        // Stopped -> Stopping has nothing to stop
        assert!(!machine.is_valid_transition(ProcessState::Stopping));
    }

    #[test]
    fn test_unhealthy_recovers_to_running() {
        let mut machine = LifecycleMachine::new();
        machine.transition_to(ProcessState::Starting, None).unwrap();
        machine.transition_to(ProcessState::Running, None).unwrap();
        machine
            .transition_to(ProcessState::Unhealthy, Some("probe failed".into()))
            .unwrap();
        machine
            .transition_to(ProcessState::Running, Some("probe recovered".into()))
            .unwrap();

        assert_eq!(machine.current_state(), ProcessState::Running);
    }

    #[test]
    fn test_crash_then_restart() {
        let mut machine = LifecycleMachine::new();
        machine.transition_to(ProcessState::Starting, None).unwrap();
        machine.transition_to(ProcessState::Running, None).unwrap();
        machine
            .transition_to(ProcessState::Crashed, Some("exit code 137".into()))
            .unwrap();

        assert!(machine.current_state().can_start());
        machine.transition_to(ProcessState::Starting, None).unwrap();
        assert_eq!(machine.current_state(), ProcessState::Starting);
    }

    #[test]
    fn test_stop_cancels_inflight_start() {
        let mut machine = LifecycleMachine::new();
        machine.transition_to(ProcessState::Starting, None).unwrap();
        machine.transition_to(ProcessState::Stopping, None).unwrap();
        machine.transition_to(ProcessState::Stopped, None).unwrap();

        assert_eq!(machine.current_state(), ProcessState::Stopped);
    }

    #[test]
    fn test_state_properties() {
        assert!(ProcessState::Stopped.can_start());
        assert!(ProcessState::Crashed.can_start());
        assert!(!ProcessState::Running.can_start());

        assert!(ProcessState::Running.can_stop());
        assert!(ProcessState::Starting.can_stop());
        assert!(!ProcessState::Stopped.can_stop());
        assert!(!ProcessState::Crashed.can_stop());

        assert!(ProcessState::Stopping.is_active());
        assert!(!ProcessState::Crashed.is_active());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut machine = LifecycleMachine::new();
        for _ in 0..120 {
            machine.transition_to(ProcessState::Starting, None).unwrap();
            machine.transition_to(ProcessState::Stopping, None).unwrap();
            machine.transition_to(ProcessState::Stopped, None).unwrap();
        }

        assert!(machine.history().len() <= 100);
    }
}

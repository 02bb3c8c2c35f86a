//! The process supervisor.
//!
//! Owns the lifecycle of exactly one external server process. Mutating
//! operations (start/stop/restart/shutdown) serialize on an async mutex
//! around the process slot; status and output queries read shared state
//! without it and tolerate concurrent transitions by re-checking under the
//! write lock before applying probe-derived transitions.

use crate::config::{ChildProcessConfig, OutputOptions};
use crate::state::{LifecycleMachine, ProcessState};
use crate::types::HealthStatus;
use chrono::{DateTime, Utc};
use geowarden_common::{Result, SupervisorError};
use geowarden_output::{collect_stream, OutputBuffer, OutputLine, StreamKind};
use geowarden_probe::{probe_http, ProbeConfig, ProbeOutcome};
use geowarden_process::{force_kill, process_exists, spawn_child, terminate_gracefully, ExecSpec};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Bounded wait for the child to be reaped after SIGKILL.
const FORCE_KILL_WAIT: Duration = Duration::from_secs(5);

/// Handle to the live child instance. Owned exclusively by the supervisor;
/// the `Child` itself lives in the exit-waiter task, which reaps it and
/// publishes the exit on the watch channel.
struct ManagedProcess {
    pid: u32,
    exit_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
}

/// State shared between operations, status probes and the exit waiter.
struct Observed {
    machine: LifecycleMachine,
    pid: Option<u32>,
    started_at: Option<DateTime<Utc>>,
    exit_code: Option<i32>,
    last_probe: Option<ProbeOutcome>,
}

impl Observed {
    fn new() -> Self {
        Self {
            machine: LifecycleMachine::new(),
            pid: None,
            started_at: None,
            exit_code: None,
            last_probe: None,
        }
    }
}

/// Supervisor for a single external server process.
pub struct Supervisor {
    process_config: ChildProcessConfig,
    slot: Mutex<Option<ManagedProcess>>,
    observed: Arc<RwLock<Observed>>,
    output: Arc<OutputBuffer>,
}

impl Supervisor {
    pub fn new(process_config: ChildProcessConfig, output_options: OutputOptions) -> Self {
        Self {
            process_config,
            slot: Mutex::new(None),
            observed: Arc::new(RwLock::new(Observed::new())),
            output: Arc::new(OutputBuffer::new(output_options.capacity)),
        }
    }

    /// Launch the child process. Returns immediately once spawned; readiness
    /// is observed through status probes.
    pub async fn start(&self) -> Result<HealthStatus> {
        let mut slot = self.slot.lock().await;
        self.start_locked(&mut slot)
    }

    /// Stop the child: SIGTERM, bounded grace wait, SIGKILL on expiry.
    pub async fn stop(&self) -> Result<HealthStatus> {
        let mut slot = self.slot.lock().await;
        self.stop_locked(&mut slot).await
    }

    /// Stop (when active) then start, under one exclusive lock.
    pub async fn restart(&self) -> Result<HealthStatus> {
        let mut slot = self.slot.lock().await;
        match self.stop_locked(&mut slot).await {
            Ok(_) | Err(SupervisorError::NotRunning) => {}
            Err(e) => return Err(e),
        }
        self.start_locked(&mut slot)
    }

    /// Build a fresh status snapshot, probing liveness and (when configured)
    /// the child's health endpoint. Never blocks longer than the probe
    /// timeout and never fails; probe problems surface as `Unhealthy`.
    pub async fn status(&self) -> HealthStatus {
        let (state, pid) = {
            let obs = self.observed.read();
            (obs.machine.current_state(), obs.pid)
        };

        let pid = match (state, pid) {
            (
                ProcessState::Starting | ProcessState::Running | ProcessState::Unhealthy,
                Some(pid),
            ) => pid,
            _ => return self.snapshot(),
        };

        // Liveness first: a dead child short-circuits the HTTP probe
        let alive = match process_exists(pid) {
            Ok(alive) => alive,
            Err(e) => {
                warn!(pid, error = %e, "liveness check failed");
                true // inconclusive; let the HTTP probe decide
            }
        };

        if !alive {
            let mut obs = self.observed.write();
            // Re-check: a concurrent stop or the exit waiter may have moved first
            if obs.machine.current_state().can_stop() {
                let reason = describe_exit(obs.exit_code);
                warn!(pid, %reason, "child process vanished");
                let _ = obs
                    .machine
                    .transition_to(ProcessState::Crashed, Some(reason));
            }
            return Self::snapshot_from(&obs);
        }

        let Some(hc) = &self.process_config.health_check else {
            // No health endpoint configured: liveness alone is readiness
            let mut obs = self.observed.write();
            if obs.machine.current_state() == ProcessState::Starting {
                let _ = obs.machine.transition_to(
                    ProcessState::Running,
                    Some("child process is alive".to_string()),
                );
            }
            return Self::snapshot_from(&obs);
        };

        let probe_config = ProbeConfig::new(hc.url.clone())
            .with_timeout(hc.timeout)
            .with_expected_status(hc.expected_status.clone());

        let outcome = match probe_http(&probe_config).await {
            Ok(outcome) => outcome,
            // Timeouts surface as an unhealthy outcome, never as a failure
            Err(e) => ProbeOutcome::failed(e.to_string()),
        };

        let mut obs = self.observed.write();
        obs.last_probe = Some(outcome.clone());
        let current = obs.machine.current_state();
        if outcome.healthy {
            if matches!(current, ProcessState::Starting | ProcessState::Unhealthy) {
                let _ = obs.machine.transition_to(
                    ProcessState::Running,
                    Some("health probe succeeded".to_string()),
                );
            }
        } else if current == ProcessState::Running {
            let reason = outcome
                .message
                .clone()
                .unwrap_or_else(|| "health probe failed".to_string());
            let _ = obs
                .machine
                .transition_to(ProcessState::Unhealthy, Some(reason));
        }
        Self::snapshot_from(&obs)
    }

    /// The most recent `n` retained output lines, oldest first.
    pub fn recent_output(&self, n: usize) -> Vec<OutputLine> {
        self.output.recent(n)
    }

    pub fn output_capacity(&self) -> usize {
        self.output.capacity()
    }

    pub fn output_dropped(&self) -> u64 {
        self.output.dropped()
    }

    /// Supervisor termination path: stop the child when active, clear any
    /// crashed leftover, and leave the lifecycle at `Stopped`.
    pub async fn shutdown(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        match self.stop_locked(&mut slot).await {
            Ok(_) => {}
            Err(SupervisorError::NotRunning) => {
                if let Some(leftover) = slot.take() {
                    leftover.cancel.cancel();
                }
                let mut obs = self.observed.write();
                if obs.machine.current_state() == ProcessState::Crashed {
                    let _ = obs.machine.transition_to(
                        ProcessState::Stopped,
                        Some("supervisor shutdown".to_string()),
                    );
                    obs.pid = None;
                    obs.started_at = None;
                }
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn start_locked(&self, slot: &mut Option<ManagedProcess>) -> Result<HealthStatus> {
        if let Some(existing) = slot.as_ref() {
            if !*existing.exit_rx.borrow() {
                return Err(SupervisorError::AlreadyRunning);
            }
            // Crashed leftover: clear it and relaunch
            if let Some(leftover) = slot.take() {
                leftover.cancel.cancel();
            }
        }

        let spec = ExecSpec {
            executable: self.process_config.executable_path.clone(),
            args: self.process_config.args.clone(),
            working_directory: self
                .process_config
                .working_directory
                .clone()
                .map(PathBuf::from),
            environment: self.process_config.environment.clone(),
        };

        // Spawn failure reports synchronously and leaves the lifecycle at Stopped
        let mut child = spawn_child(&spec)?;
        let pid = child
            .id()
            .ok_or_else(|| SupervisorError::launch("child exited before a pid was observed"))?;
        let started_at = Utc::now();

        // The relay window covers the current instance only
        self.output.clear();
        let cancel = CancellationToken::new();
        if let Some(stdout) = child.stdout.take() {
            let _ = collect_stream(
                Arc::clone(&self.output),
                stdout,
                StreamKind::Stdout,
                cancel.child_token(),
            );
        }
        if let Some(stderr) = child.stderr.take() {
            let _ = collect_stream(
                Arc::clone(&self.output),
                stderr,
                StreamKind::Stderr,
                cancel.child_token(),
            );
        }

        {
            let mut obs = self.observed.write();
            obs.machine.transition_to(
                ProcessState::Starting,
                Some("start requested".to_string()),
            )?;
            obs.pid = Some(pid);
            obs.started_at = Some(started_at);
            obs.exit_code = None;
            obs.last_probe = None;
        }

        let (exit_tx, exit_rx) = watch::channel(false);
        let observed = Arc::clone(&self.observed);
        tokio::spawn(async move {
            let status = child.wait().await;
            let mut obs = observed.write();
            let reason = match status {
                Ok(st) => {
                    obs.exit_code = st.code();
                    describe_exit(st.code())
                }
                Err(e) => format!("failed to reap child: {}", e),
            };
            if obs.machine.current_state().can_stop() {
                warn!(
                    pid,
                    error = %SupervisorError::Crashed { exit_code: obs.exit_code },
                    "child exited unexpectedly"
                );
                let _ = obs
                    .machine
                    .transition_to(ProcessState::Crashed, Some(reason));
            } else {
                debug!(pid, %reason, "child exited");
            }
            let _ = exit_tx.send(true);
        });

        *slot = Some(ManagedProcess {
            pid,
            exit_rx,
            cancel,
        });

        info!(pid, executable = %self.process_config.executable_path, "child process launched");
        Ok(self.snapshot())
    }

    async fn stop_locked(&self, slot: &mut Option<ManagedProcess>) -> Result<HealthStatus> {
        let (pid, mut exit_rx, cancel) = match slot.as_ref() {
            None => return Err(SupervisorError::NotRunning),
            // An already-exited child has nothing to stop; its state is left
            // unchanged for the caller to inspect
            Some(existing) if *existing.exit_rx.borrow() => {
                return Err(SupervisorError::NotRunning)
            }
            Some(existing) => (
                existing.pid,
                existing.exit_rx.clone(),
                existing.cancel.clone(),
            ),
        };

        {
            let mut obs = self.observed.write();
            if !obs.machine.current_state().can_stop() {
                // The exit waiter won the race; nothing left to stop
                return Err(SupervisorError::NotRunning);
            }
            obs.machine
                .transition_to(ProcessState::Stopping, Some("stop requested".to_string()))?;
        }

        info!(pid, "stopping child process");
        if let Err(e) = terminate_gracefully(pid) {
            // Child may have exited between the state check and the signal
            debug!(pid, error = %e, "graceful termination signal not delivered");
        }

        let grace = self.process_config.graceful_timeout;
        let timed_out = match timeout(grace, exit_rx.wait_for(|exited| *exited)).await {
            Ok(Ok(_)) => false,
            Ok(Err(_)) => {
                warn!(pid, "exit watch closed unexpectedly");
                false
            }
            Err(_) => true,
        };

        if timed_out {
            warn!(
                pid,
                error = %SupervisorError::TerminationTimeout { grace },
                "grace period elapsed; force-killing child"
            );
            if let Err(e) = force_kill(pid) {
                warn!(pid, error = %e, "force kill signal not delivered");
            }
            let _ = timeout(FORCE_KILL_WAIT, exit_rx.wait_for(|exited| *exited)).await;
        }

        cancel.cancel();
        slot.take();

        {
            let mut obs = self.observed.write();
            obs.machine
                .transition_to(ProcessState::Stopped, Some("stop completed".to_string()))?;
            obs.pid = None;
            obs.started_at = None;
            obs.last_probe = None;
        }

        info!(pid, "child process stopped");
        Ok(self.snapshot())
    }

    fn snapshot(&self) -> HealthStatus {
        Self::snapshot_from(&self.observed.read())
    }

    fn snapshot_from(obs: &Observed) -> HealthStatus {
        let state = obs.machine.current_state();
        let uptime_seconds = match (state.is_active(), obs.started_at) {
            (true, Some(started)) => Some((Utc::now() - started).num_seconds().max(0) as u64),
            _ => None,
        };
        let message = match state {
            ProcessState::Crashed => Some(describe_exit(obs.exit_code)),
            ProcessState::Unhealthy => obs.last_probe.as_ref().and_then(|p| p.message.clone()),
            _ => None,
        };

        HealthStatus {
            state,
            pid: if state.is_active() { obs.pid } else { None },
            started_at: obs.started_at,
            uptime_seconds,
            exit_code: if state == ProcessState::Crashed {
                obs.exit_code
            } else {
                None
            },
            last_probe: obs.last_probe.clone(),
            message,
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("child exited with code {}", code),
        None => "child terminated by signal".to_string(),
    }
}

//! Process termination primitives.
//!
//! The supervisor terminates its child with the standard graceful-then-
//! forceful signal pair: SIGTERM first, SIGKILL once the grace period
//! elapses.

use geowarden_common::{Result, SupervisorError};

/// Send the graceful termination signal (SIGTERM) to a process.
pub fn terminate_gracefully(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        send_signal(pid, nix::sys::signal::Signal::SIGTERM)
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(SupervisorError::signal(
            "graceful termination requires a unix platform",
        ))
    }
}

/// Force-kill a process (SIGKILL).
pub fn force_kill(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        send_signal(pid, nix::sys::signal::Signal::SIGKILL)
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(SupervisorError::signal(
            "force kill requires a unix platform",
        ))
    }
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: nix::sys::signal::Signal) -> Result<()> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let nix_pid = Pid::from_raw(pid as i32);
    kill(nix_pid, signal)
        .map_err(|e| SupervisorError::signal(format!("{} to pid {}: {}", signal, pid, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_signal_to_nonexistent_process_fails() {
        // A fresh high pid is almost certainly unused
        let err = terminate_gracefully(0x3FFF_FF00).unwrap_err();
        assert!(matches!(err, SupervisorError::Signal { .. }));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_terminate_then_kill_sequence() {
        use crate::spawn::{spawn_child, ExecSpec};

        let spec = ExecSpec {
            executable: "/bin/sleep".to_string(),
            args: vec!["30".to_string()],
            ..Default::default()
        };
        let mut child = spawn_child(&spec).unwrap();
        let pid = child.id().unwrap();

        terminate_gracefully(pid).unwrap();
        let status = child.wait().await.unwrap();
        assert!(!status.success());
    }
}

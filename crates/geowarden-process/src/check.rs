//! Process existence checking.
//!
//! Non-destructive liveness check used by status probes. On Unix this is
//! `kill(pid, 0)`, which sends no signal but reports whether the process
//! exists.

use geowarden_common::{Result, SupervisorError};

/// Check if a process with the given PID exists and is running.
///
/// Returns `Ok(true)` when the process exists, `Ok(false)` when it does not,
/// and an error only when the check itself could not be performed.
pub fn process_exists(pid: u32) -> Result<bool> {
    #[cfg(unix)]
    {
        process_exists_unix(pid)
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(SupervisorError::signal(
            "process liveness checks require a unix platform",
        ))
    }
}

#[cfg(unix)]
fn process_exists_unix(pid: u32) -> Result<bool> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let nix_pid = Pid::from_raw(pid as i32);

    match kill(nix_pid, None) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::ESRCH) => Ok(false),
        // Process exists but belongs to another user
        Err(nix::errno::Errno::EPERM) => Ok(true),
        Err(e) => Err(SupervisorError::signal(format!(
            "failed to check process {}: {}",
            pid, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_current_process_exists() {
        let current_pid = std::process::id();
        assert!(process_exists(current_pid).unwrap());
    }

    #[test]
    #[cfg(unix)]
    fn test_init_process_exists() {
        assert!(process_exists(1).unwrap());
    }
}

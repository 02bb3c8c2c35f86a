//! Child process spawning.

use geowarden_common::{Result, SupervisorError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

/// Everything needed to launch the child executable.
#[derive(Debug, Clone, Default)]
pub struct ExecSpec {
    pub executable: String,
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment: HashMap<String, String>,
}

/// Spawn the child process with stdout and stderr piped back to the
/// supervisor and stdin closed.
///
/// The child is killed on drop so an aborted supervisor cannot leave an
/// orphaned server behind.
pub fn spawn_child(spec: &ExecSpec) -> Result<Child> {
    let mut command = Command::new(&spec.executable);
    command
        .args(&spec.args)
        .envs(&spec.environment)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = &spec.working_directory {
        command.current_dir(dir);
    }

    debug!(executable = %spec.executable, args = ?spec.args, "spawning child process");

    command
        .spawn()
        .map_err(|e| SupervisorError::launch(format!("{}: {}", spec.executable, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_missing_executable_is_launch_error() {
        let spec = ExecSpec {
            executable: "/nonexistent/geowarden-test-binary".to_string(),
            ..Default::default()
        };

        let err = spawn_child(&spec).unwrap_err();
        assert!(matches!(err, SupervisorError::Launch { .. }));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_spawn_pipes_stdout() {
        use tokio::io::AsyncReadExt;

        let spec = ExecSpec {
            executable: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), "echo hello".to_string()],
            ..Default::default()
        };

        let mut child = spawn_child(&spec).unwrap();
        let mut stdout = child.stdout.take().unwrap();
        let mut buf = String::new();
        stdout.read_to_string(&mut buf).await.unwrap();
        child.wait().await.unwrap();

        assert_eq!(buf.trim(), "hello");
    }
}

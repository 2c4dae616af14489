// src/exec/process.rs

//! Child process runner shared by the local and SSH executors.

use std::process::{Output, Stdio};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::exec::backend::{ExecError, Invocation};

/// Spawn `cmd`, capture its output, and stop it when the invocation's
/// deadline passes or its token is cancelled.
///
/// - The child is spawned with `kill_on_drop(true)`, so losing the race
///   against the deadline or the cancel token kills the process.
/// - A spawn or wait failure is an `Internal` error.
pub async fn run_process(
    mut cmd: Command,
    invocation: &Invocation,
    label: &str,
) -> Result<Output, ExecError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| ExecError::Internal(format!("spawning {label}: {e}")))?;

    debug!(process = %label, pid = ?child.id(), "child process started");

    tokio::select! {
        res = child.wait_with_output() => {
            let output = res
                .map_err(|e| ExecError::Internal(format!("waiting for {label}: {e}")))?;
            info!(
                process = %label,
                exit_code = ?output.status.code(),
                success = output.status.success(),
                "child process exited"
            );
            Ok(output)
        }

        _ = tokio::time::sleep_until(invocation.deadline) => {
            warn!(
                process = %label,
                timeout_secs = invocation.timeout.as_secs(),
                "deadline passed; killing child process"
            );
            Err(ExecError::Timeout(invocation.timeout))
        }

        _ = invocation.cancel.cancelled() => {
            info!(process = %label, "cancellation requested; killing child process");
            Err(ExecError::Cancelled)
        }
    }
}

/// Stdout, or stderr when stdout is blank.
pub fn captured_text(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else {
        stdout.into_owned()
    }
}

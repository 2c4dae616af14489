// src/exec/local.rs

//! Runs command lines on this machine through `sh -c`.

use tokio::process::Command;

use crate::exec::backend::{ConnectionDetails, ExecError, ExecFuture, Invocation, RemoteExecutor};
use crate::exec::process::{captured_text, run_process};

/// Executes commands locally; connection details are ignored.
#[derive(Debug, Clone, Default)]
pub struct LocalShellExecutor;

impl LocalShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl RemoteExecutor for LocalShellExecutor {
    fn execute<'a>(
        &'a self,
        _connection: Option<&'a ConnectionDetails>,
        command_line: &'a str,
        invocation: Invocation,
    ) -> ExecFuture<'a> {
        Box::pin(async move {
            let mut cmd = if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(command_line);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(command_line);
                c
            };
            cmd.kill_on_drop(true);

            let output = run_process(cmd, &invocation, "local shell").await?;
            let text = captured_text(&output);

            if output.status.success() {
                Ok(text)
            } else {
                Err(ExecError::NonZeroExit {
                    code: output.status.code().unwrap_or(-1),
                    output: text,
                })
            }
        })
    }

    fn requires_connection(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

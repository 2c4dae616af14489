// src/exec/ssh.rs

//! Remote execution through the system `ssh` client.
//!
//! The password is handed to `sshpass -e` through the `SSHPASS` environment
//! variable so it never appears on a command line.

use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::exec::backend::{ConnectionDetails, ExecError, ExecFuture, Invocation, RemoteExecutor};
use crate::exec::process::{captured_text, run_process};

/// `ssh` exits with 255 when the connection itself fails.
const SSH_CONNECTION_EXIT: i32 = 255;
/// `sshpass` reports a rejected password with 5.
const SSHPASS_AUTH_EXIT: i32 = 5;
/// `sshpass` reports an unknown or changed host key with 6.
const SSHPASS_HOST_KEY_EXIT: i32 = 6;

#[derive(Debug, Clone)]
pub struct SshExecutor {
    connect_timeout: Duration,
}

impl SshExecutor {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn command(&self, connection: &ConnectionDetails, command_line: &str) -> Command {
        let mut cmd = Command::new("sshpass");
        cmd.arg("-e")
            .arg("ssh")
            .arg("-p")
            .arg(connection.port.to_string())
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)))
            .arg(format!("{}@{}", connection.username, connection.host))
            .arg(command_line)
            .env("SSHPASS", &connection.password);
        cmd
    }
}

impl Default for SshExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl RemoteExecutor for SshExecutor {
    fn execute<'a>(
        &'a self,
        connection: Option<&'a ConnectionDetails>,
        command_line: &'a str,
        invocation: Invocation,
    ) -> ExecFuture<'a> {
        Box::pin(async move {
            let connection = connection.ok_or_else(|| {
                ExecError::Internal("ssh executor called without connection details".into())
            })?;

            debug!(
                host = %connection.host,
                port = connection.port,
                user = %connection.username,
                command = %command_line,
                "running remote command"
            );

            let cmd = self.command(connection, command_line);
            let label = format!("ssh {}@{}", connection.username, connection.host);
            let output = run_process(cmd, &invocation, &label).await?;
            let text = captured_text(&output);

            match output.status.code() {
                Some(0) => Ok(text),
                code => Err(classify_failure(code, text)),
            }
        })
    }

    fn name(&self) -> &'static str {
        "ssh"
    }
}

/// Map a failed `sshpass`/`ssh` exit onto the collaborator error taxonomy.
pub fn classify_failure(code: Option<i32>, output: String) -> ExecError {
    let message = output.trim().to_string();
    match code {
        Some(SSHPASS_AUTH_EXIT) => ExecError::Authentication(message),
        Some(SSHPASS_HOST_KEY_EXIT) => ExecError::Connection(message),
        Some(SSH_CONNECTION_EXIT) if message.contains("Permission denied") => {
            ExecError::Authentication(message)
        }
        Some(SSH_CONNECTION_EXIT) => ExecError::Connection(message),
        Some(code) => ExecError::NonZeroExit { code, output },
        None => ExecError::Internal(format!("remote command terminated by signal: {message}")),
    }
}

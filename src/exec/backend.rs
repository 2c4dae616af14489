// src/exec/backend.rs

//! Pluggable remote execution abstraction.
//!
//! The dispatcher talks to a `RemoteExecutor` instead of a concrete transport.
//! Production code uses [`super::SshExecutor`] or [`super::LocalShellExecutor`];
//! tests provide a scripted fake that never spawns processes.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::dag::{ErrorKind, NodeError};

/// Where and as whom commands run.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDetails {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_port() -> u16 {
    22
}

impl ConnectionDetails {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Names of required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.host.trim().is_empty() {
            missing.push("host");
        }
        if self.username.trim().is_empty() {
            missing.push("username");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        missing
    }
}

// Keep the password out of logs.
impl fmt::Debug for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDetails")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Per-invocation limits handed to the executor.
///
/// Executors must stop the remote command when the deadline passes or the
/// token is cancelled; the dispatcher also enforces the deadline around the
/// call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub deadline: Instant,
    /// The timeout the deadline was derived from, for error reporting.
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

/// Latest deadline handed out; longer timeouts are capped here.
pub const MAX_DEADLINE: Duration = Duration::from_secs(86_400 * 365 * 30);

impl Invocation {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout.min(MAX_DEADLINE))
            .or_else(|| now.checked_add(Duration::from_secs(86_400)))
            .unwrap_or(now);
        Self {
            deadline,
            timeout,
            cancel,
        }
    }
}

/// Classified failure of one remote invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("command exited with code {code}: {output}")]
    NonZeroExit { code: i32, output: String },

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::Connection(_) => ErrorKind::Connection,
            ExecError::Authentication(_) => ErrorKind::Authentication,
            ExecError::NonZeroExit { .. } => ErrorKind::NonZeroExit,
            ExecError::Timeout(_) => ErrorKind::Timeout,
            ExecError::Cancelled => ErrorKind::Cancelled,
            ExecError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn to_node_error(&self) -> NodeError {
        NodeError::new(self.kind(), self.to_string())
    }
}

pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ExecError>> + Send + 'a>>;

/// Trait abstracting how a command line is executed.
pub trait RemoteExecutor: Send + Sync {
    /// Run one command line and return its captured output.
    ///
    /// `connection` is `None` only when [`requires_connection`] is false.
    ///
    /// [`requires_connection`]: RemoteExecutor::requires_connection
    fn execute<'a>(
        &'a self,
        connection: Option<&'a ConnectionDetails>,
        command_line: &'a str,
        invocation: Invocation,
    ) -> ExecFuture<'a>;

    /// Whether submissions must carry connection details.
    fn requires_connection(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}

// src/exec/mod.rs

//! Remote execution layer.
//!
//! The dispatcher never spawns processes itself; it hands a command line and
//! an [`Invocation`] (deadline + cancellation token) to a [`RemoteExecutor`].
//!
//! - [`backend`] defines the `RemoteExecutor` trait, connection details and
//!   the classified `ExecError`.
//! - [`command`] builds the command line for a node from its resolved
//!   arguments and optional script.
//! - [`process`] runs a child process under a deadline and cancel token.
//! - [`ssh`] runs commands on a remote host through the system `ssh` client.
//! - [`local`] runs commands on this machine, mainly for development and
//!   tests.

pub mod backend;
pub mod command;
pub mod local;
pub mod process;
pub mod ssh;

pub use backend::{ConnectionDetails, ExecError, ExecFuture, Invocation, RemoteExecutor};
pub use command::{build_command_line, shell_quote};
pub use local::LocalShellExecutor;
pub use ssh::SshExecutor;

// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::ExecutorKind;

/// Command-line arguments for `nodeflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "nodeflow",
    version,
    about = "Run DAGs of remote commands with retries, timeouts and checkpoints.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Nodeflow.toml` in the current working directory; a missing
    /// default file means built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `NODEFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Override `[executor].kind` from the config (ssh, local).
    #[arg(long, value_name = "KIND")]
    pub executor: Option<ExecutorKind>,

    /// Run one `graph_execute` message read from this JSON file, print
    /// events as JSON lines, and exit.
    ///
    /// Without `--graph`, nodeflow serves a JSON-lines session on
    /// stdin/stdout.
    #[arg(long, value_name = "PATH")]
    pub graph: Option<PathBuf>,

    /// Seed the `--graph` run from the checkpoint saved for this execution
    /// id.
    #[arg(long, value_name = "ID", requires = "graph")]
    pub restore: Option<String>,

    /// Validate the `--graph` file and print the plan, but don't execute
    /// any commands.
    #[arg(long, requires = "graph")]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

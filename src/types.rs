use std::str::FromStr;
use serde::Deserialize;

/// Which remote execution collaborator runs node commands.
///
/// - `Ssh`: run every command on the host named in the submission's `ssh`
///   block (default).
/// - `Local`: run commands with `sh -c` on this machine; connection details
///   become optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Ssh,
    Local,
}

impl Default for ExecutorKind {
    fn default() -> Self {
        ExecutorKind::Ssh
    }
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ssh" => Ok(ExecutorKind::Ssh),
            "local" => Ok(ExecutorKind::Local),
            other => Err(format!(
                "invalid executor kind: {other} (expected \"ssh\" or \"local\")"
            )),
        }
    }
}

/// Where checkpoints are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointStorage {
    /// One JSON file per checkpoint key under `[checkpoint].dir`.
    File,
    /// Kept in memory only (lost on restart).
    Memory,
}

impl Default for CheckpointStorage {
    fn default() -> Self {
        CheckpointStorage::File
    }
}

impl FromStr for CheckpointStorage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(CheckpointStorage::File),
            "memory" => Ok(CheckpointStorage::Memory),
            other => Err(format!(
                "invalid checkpoint storage: {other} (expected \"file\" or \"memory\")"
            )),
        }
    }
}

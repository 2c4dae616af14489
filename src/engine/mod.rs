// src/engine/mod.rs

//! Execution engine for nodeflow.
//!
//! This module ties together:
//! - the per-execution dispatcher loop that launches ready nodes
//! - node tasks that run one node's invocations and apply the outcome
//! - the run controller (submit, pause/resume, cancel, checkpoint/restore,
//!   whole-graph repeat)
//! - the progress emitter that turns state transitions into [`EngineEvent`]s
//!
//! Pure state transitions live in [`crate::dag`]; this module is the async
//! shell around them.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigFile;
use crate::dag::NodeState;

/// Canonical execution identifier type.
pub type ExecutionId = String;

/// Events streamed to the caller while an execution runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EngineEvent {
    /// Full per-node snapshot, in submission order.
    Progress {
        execution_id: ExecutionId,
        nodes: Vec<NodeState>,
    },
    /// A node reached Completed, Error or Blocked.
    NodeFinished {
        execution_id: ExecutionId,
        node: NodeState,
    },
    /// One whole-graph repeat ran to termination (or was cancelled).
    Summary(RunSummary),
    /// Every repeat of the execution is done.
    SummaryReport(RunReport),
}

impl EngineEvent {
    pub fn execution_id(&self) -> &str {
        match self {
            EngineEvent::Progress { execution_id, .. }
            | EngineEvent::NodeFinished { execution_id, .. } => execution_id,
            EngineEvent::Summary(summary) => &summary.execution_id,
            EngineEvent::SummaryReport(report) => &report.execution_id,
        }
    }
}

/// Engine tuning, usually taken from the `[engine]` and `[executor]` config
/// sections.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Interval between readiness scans.
    pub poll_interval: Duration,
    /// How long a cancelled execution waits for in-flight node tasks.
    pub shutdown_grace: Duration,
    /// Directory relative node scripts are resolved against.
    pub script_dir: PathBuf,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&ConfigFile::default())
    }
}

impl EngineOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            poll_interval: cfg.engine.poll_interval(),
            shutdown_grace: cfg.engine.shutdown_grace(),
            script_dir: cfg.executor.script_dir.clone(),
        }
    }
}

pub mod controller;
pub mod dispatcher;
pub mod execution;
pub mod node_task;
pub mod progress;
pub mod summary;

pub use controller::{ExecutionHandle, RunController};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use execution::Execution;
pub use progress::ProgressEmitter;
pub use summary::{AggregateStatus, RunReport, RunSummary};

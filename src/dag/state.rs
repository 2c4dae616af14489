// src/dag/state.rs

//! Per-node mutable run state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dag::node::NodeId;

/// Status of a node within one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Waiting for dependencies (or for a retry).
    Pending,
    /// Dispatched; an invocation is in flight.
    Running,
    Completed,
    /// Failed with no retries left.
    Error,
    /// Can never run because an ancestor ended in `Error`.
    Blocked,
}

impl NodeStatus {
    /// Completed, Error and Blocked end a node's participation in a run.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeStatus::Completed | NodeStatus::Error | NodeStatus::Blocked
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Completed => "completed",
            NodeStatus::Error => "error",
            NodeStatus::Blocked => "blocked",
        }
    }
}

/// Classification of a recorded node error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Authentication,
    NonZeroExit,
    Timeout,
    Cancelled,
    Internal,
    /// Recorded on nodes that were blocked by a failed ancestor.
    UpstreamFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl NodeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Mutable record for one node in one execution.
///
/// This is also the checkpoint format: a checkpoint is a JSON object mapping
/// node id to this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    pub node_id: NodeId,
    pub status: NodeStatus,
    /// Arguments as resolved when the node was last marked Running.
    #[serde(default)]
    pub resolved_args: Vec<String>,
    /// Retries consumed so far; never exceeds the node's `max_retries`.
    #[serde(default)]
    pub retry_count: u32,
    /// Attempts started so far (retries included).
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<NodeError>,
    #[serde(default)]
    pub output: Option<String>,
    /// Outputs appended by parents as they complete, in completion order.
    #[serde(default)]
    pub collected_inputs: Vec<String>,
}

impl NodeState {
    /// Fresh Pending state.
    pub fn pending(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            status: NodeStatus::Pending,
            resolved_args: Vec::new(),
            retry_count: 0,
            attempts: 0,
            start_time: None,
            end_time: None,
            error: None,
            output: None,
            collected_inputs: Vec::new(),
        }
    }
}

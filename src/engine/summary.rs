// src/engine/summary.rs

//! Run summaries: aggregate status, first error and time span of a run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dag::{Graph, NodeError, NodeId, NodeState, NodeStatus};
use crate::engine::ExecutionId;

/// Overall outcome of one run (or of every repeat together).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    /// Every node Completed.
    Completed,
    /// At least one node ended Error and no sink node Completed.
    Failed,
    /// Some work completed, some did not.
    Partial,
    /// The run was cancelled before every node finished.
    Cancelled,
}

impl AggregateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateStatus::Completed => "completed",
            AggregateStatus::Failed => "failed",
            AggregateStatus::Partial => "partial",
            AggregateStatus::Cancelled => "cancelled",
        }
    }

    /// Aggregate status of one run from its final node states.
    ///
    /// - `completed` when every node is Completed;
    /// - `cancelled` when the run was cancelled before that;
    /// - `failed` when some node is Error and every sink (node without
    ///   dependents) is Error or Blocked;
    /// - `partial` otherwise.
    pub fn of_run(graph: &Graph, states: &[NodeState], cancelled: bool) -> Self {
        if states.iter().all(|s| s.status == NodeStatus::Completed) {
            return AggregateStatus::Completed;
        }
        if cancelled {
            return AggregateStatus::Cancelled;
        }

        let any_error = states.iter().any(|s| s.status == NodeStatus::Error);
        let sinks_failed = states
            .iter()
            .filter(|s| graph.dag().is_sink(&s.node_id))
            .all(|s| matches!(s.status, NodeStatus::Error | NodeStatus::Blocked));

        if any_error && sinks_failed {
            AggregateStatus::Failed
        } else {
            AggregateStatus::Partial
        }
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one whole-graph repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub execution_id: ExecutionId,
    /// 1-based index of this repeat.
    pub repeat: u32,
    pub repeat_total: u32,
    pub node_ids: Vec<NodeId>,
    /// Earliest node start time.
    pub start_time: Option<DateTime<Utc>>,
    /// Latest node end time.
    pub end_time: Option<DateTime<Utc>>,
    pub status: AggregateStatus,
    /// Earliest error of a node that ended in Error.
    pub error: Option<NodeError>,
}

impl RunSummary {
    pub fn build(
        execution_id: &str,
        repeat: u32,
        repeat_total: u32,
        graph: &Graph,
        states: &[NodeState],
        cancelled: bool,
    ) -> Self {
        let (start_time, end_time) = time_span(states);
        Self {
            execution_id: execution_id.to_string(),
            repeat,
            repeat_total,
            node_ids: states.iter().map(|s| s.node_id.clone()).collect(),
            start_time,
            end_time,
            status: AggregateStatus::of_run(graph, states, cancelled),
            error: first_error(states),
        }
    }
}

/// Final report over every repeat of an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub execution_id: ExecutionId,
    pub repeat_total: u32,
    pub node_ids: Vec<NodeId>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: AggregateStatus,
    pub error: Option<NodeError>,
    pub summaries: Vec<RunSummary>,
}

impl RunReport {
    /// Fold the per-repeat summaries.
    ///
    /// The report is `completed` only if every requested repeat ran and
    /// completed, `cancelled` if the last repeat was cancelled, `failed` if
    /// every repeat failed, and `partial` otherwise.
    pub fn from_summaries(
        execution_id: &str,
        repeat_total: u32,
        node_ids: Vec<NodeId>,
        summaries: Vec<RunSummary>,
    ) -> Self {
        let status = match summaries.last().map(|s| s.status) {
            None => AggregateStatus::Cancelled,
            Some(AggregateStatus::Cancelled) => AggregateStatus::Cancelled,
            Some(_)
                if summaries.len() == repeat_total as usize
                    && summaries
                        .iter()
                        .all(|s| s.status == AggregateStatus::Completed) =>
            {
                AggregateStatus::Completed
            }
            Some(_) if summaries.iter().all(|s| s.status == AggregateStatus::Failed) => {
                AggregateStatus::Failed
            }
            Some(_) => AggregateStatus::Partial,
        };

        Self {
            execution_id: execution_id.to_string(),
            repeat_total,
            node_ids,
            start_time: summaries.iter().filter_map(|s| s.start_time).min(),
            end_time: summaries.iter().filter_map(|s| s.end_time).max(),
            status,
            error: summaries.iter().find_map(|s| s.error.clone()),
            summaries,
        }
    }
}

fn time_span(states: &[NodeState]) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let start = states.iter().filter_map(|s| s.start_time).min();
    let end = states.iter().filter_map(|s| s.end_time).max();
    (start, end)
}

fn first_error(states: &[NodeState]) -> Option<NodeError> {
    states
        .iter()
        .filter(|s| s.status == NodeStatus::Error)
        .min_by_key(|s| s.end_time)
        .and_then(|s| s.error.clone())
}

// src/dag/state_manager.rs

//! State transitions for nodes within one execution.
//!
//! Every transition goes through the entry lock of the node it changes. The
//! only cross-entry write is appending a completed parent's output to its
//! dependents, which takes each dependent's own lock in turn.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::dag::graph::Graph;
use crate::dag::node::NodeId;
use crate::dag::state::{ErrorKind, NodeError, NodeState, NodeStatus};
use crate::dag::store::StateStore;

/// What happened to a node after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Back to Pending; the readiness scan will pick it up again.
    Retry,
    /// No retries left; the node is permanently Error.
    Exhausted,
}

/// Applies state transitions to a [`StateStore`] for one graph.
pub struct StateManager<'a> {
    graph: &'a Graph,
    store: &'a StateStore,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a Graph, store: &'a StateStore) -> Self {
        Self { graph, store }
    }

    /// Whether every dependency of `id` is Completed.
    pub fn deps_satisfied(&self, id: &str) -> bool {
        self.graph
            .dag()
            .dependencies_of(id)
            .iter()
            .all(|dep| self.store.status_of(dep) == Some(NodeStatus::Completed))
    }

    /// Pending nodes whose dependencies are all Completed, in submission
    /// order.
    pub fn ready_nodes(&self) -> Vec<NodeId> {
        self.graph
            .node_ids()
            .filter(|id| self.store.status_of(id) == Some(NodeStatus::Pending))
            .filter(|id| self.deps_satisfied(id))
            .map(|id| id.to_string())
            .collect()
    }

    /// Transition Pending -> Running, stamping the start time and storing the
    /// resolved arguments.
    ///
    /// Returns the new state, or `None` if the node was no longer Pending.
    pub fn mark_running(&self, id: &str, resolved_args: Vec<String>) -> Option<NodeState> {
        self.store
            .with_entry(id, |s| {
                if s.status != NodeStatus::Pending {
                    return None;
                }
                s.status = NodeStatus::Running;
                s.start_time = Some(Utc::now());
                s.end_time = None;
                s.error = None;
                s.attempts += 1;
                s.resolved_args = resolved_args;
                Some(s.clone())
            })
            .flatten()
    }

    /// Record a successful attempt.
    ///
    /// The output is appended to every not-yet-started dependent before this
    /// node turns Completed, so a dependent that becomes ready already sees
    /// it.
    pub fn record_success(&self, id: &str, output: String) -> Option<NodeState> {
        for dependent in self.graph.dag().dependents_of(id) {
            self.store.with_entry(dependent, |d| {
                if matches!(d.status, NodeStatus::Pending | NodeStatus::Blocked) {
                    d.collected_inputs.push(output.clone());
                }
            });
        }

        let state = self.store.with_entry(id, |s| {
            s.status = NodeStatus::Completed;
            s.output = Some(output);
            s.error = None;
            s.end_time = Some(Utc::now());
            s.clone()
        })?;

        info!(node = %id, attempts = state.attempts, "node completed");
        Some(state)
    }

    /// Record a failed attempt and decide whether the node retries.
    pub fn record_failure(&self, id: &str, error: NodeError) -> Option<(FailureDisposition, NodeState)> {
        let max_retries = self.graph.node(id).map(|n| n.max_retries).unwrap_or(0);

        let (disposition, state) = self.store.with_entry(id, |s| {
            s.end_time = Some(Utc::now());
            s.error = Some(error);
            let disposition = if s.retry_count < max_retries {
                s.retry_count += 1;
                s.status = NodeStatus::Pending;
                FailureDisposition::Retry
            } else {
                s.status = NodeStatus::Error;
                FailureDisposition::Exhausted
            };
            (disposition, s.clone())
        })?;

        match disposition {
            FailureDisposition::Retry => warn!(
                node = %id,
                retry_count = state.retry_count,
                max_retries,
                error = ?state.error,
                "node attempt failed; scheduling retry"
            ),
            FailureDisposition::Exhausted => warn!(
                node = %id,
                retry_count = state.retry_count,
                max_retries,
                error = ?state.error,
                "node failed with no retries left"
            ),
        }

        Some((disposition, state))
    }

    /// Record an attempt that was cut short by cancellation.
    ///
    /// The attempt does not consume a retry; the node goes back to Pending.
    pub fn record_cancelled(&self, id: &str) -> Option<NodeState> {
        let state = self.store.with_entry(id, |s| {
            if s.status == NodeStatus::Running {
                s.status = NodeStatus::Pending;
                s.end_time = Some(Utc::now());
                s.error = Some(NodeError::new(ErrorKind::Cancelled, "execution cancelled"));
            }
            s.clone()
        })?;
        debug!(node = %id, "node attempt cancelled");
        Some(state)
    }

    /// Mark every Pending node that has an Error or Blocked dependency as
    /// Blocked.
    ///
    /// Walks the topological order, so one call propagates through any depth.
    /// Returns the nodes that were newly blocked.
    pub fn propagate_blocked(&self) -> Vec<NodeState> {
        let mut newly_blocked = Vec::new();

        for id in self.graph.dag().topological_order() {
            if self.store.status_of(id) != Some(NodeStatus::Pending) {
                continue;
            }

            let failed_dep = self
                .graph
                .dag()
                .dependencies_of(id)
                .iter()
                .find(|dep| {
                    matches!(
                        self.store.status_of(dep),
                        Some(NodeStatus::Error) | Some(NodeStatus::Blocked)
                    )
                })
                .cloned();

            let Some(failed_dep) = failed_dep else {
                continue;
            };

            let blocked = self.store.with_entry(id, |s| {
                if s.status != NodeStatus::Pending {
                    return None;
                }
                s.status = NodeStatus::Blocked;
                s.end_time = Some(Utc::now());
                s.error = Some(NodeError::new(
                    ErrorKind::UpstreamFailed,
                    format!("blocked by failed dependency '{failed_dep}'"),
                ));
                Some(s.clone())
            });

            if let Some(Some(state)) = blocked {
                debug!(node = %id, dependency = %failed_dep, "marking node Blocked");
                newly_blocked.push(state);
            }
        }

        newly_blocked
    }
}

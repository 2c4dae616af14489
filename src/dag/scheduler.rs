// src/dag/scheduler.rs

use std::sync::Arc;

use tracing::{debug, info};

use crate::dag::graph::Graph;
use crate::dag::resolver::ReferenceResolver;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state::{NodeError, NodeState};
use crate::dag::state_manager::{FailureDisposition, StateManager};
use crate::dag::store::StateStore;

/// Scheduler holds the immutable graph plus the execution's state store.
///
/// It is responsible for:
/// - finding ready nodes and propagating `Blocked`
/// - moving a node to Running with its arguments resolved
/// - applying attempt outcomes (success, retry, permanent error)
/// - detecting when every node is terminal
///
/// It does no IO and holds no locks between calls; the async dispatcher
/// drives it.
#[derive(Debug, Clone)]
pub struct Scheduler {
    graph: Arc<Graph>,
    store: Arc<StateStore>,
}

impl Scheduler {
    pub fn new(graph: Arc<Graph>, store: Arc<StateStore>) -> Self {
        Self { graph, store }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    fn manager(&self) -> StateManager<'_> {
        StateManager::new(&self.graph, &self.store)
    }

    /// One readiness scan: propagate Blocked, then collect ready nodes.
    pub fn scan(&self) -> SchedulerStep {
        let manager = self.manager();
        let newly_blocked = manager.propagate_blocked();
        let ready = manager.ready_nodes();
        let all_terminal = self.store.all_terminal();

        if !ready.is_empty() || !newly_blocked.is_empty() {
            debug!(?ready, blocked = newly_blocked.len(), "scheduler scan");
        }

        SchedulerStep {
            ready,
            newly_blocked,
            all_terminal,
        }
    }

    /// Whether the dependencies of `id` are all Completed.
    pub fn deps_satisfied(&self, id: &str) -> bool {
        self.manager().deps_satisfied(id)
    }

    /// Resolve the node's arguments and mark it Running.
    ///
    /// Returns `None` if the node is unknown, no longer Pending, or its
    /// dependencies are not all Completed.
    pub fn start_node(&self, id: &str) -> Option<NodeState> {
        let node = self.graph.node(id)?;
        let manager = self.manager();
        if !manager.deps_satisfied(id) {
            return None;
        }

        let resolved = ReferenceResolver::new(&self.store).resolve_args(node);
        let state = manager.mark_running(id, resolved)?;

        if state.attempts > 1 {
            info!(node = %id, attempt = state.attempts, "dispatching node retry");
        } else {
            info!(node = %id, parallel = node.parallel, "dispatching node");
        }
        Some(state)
    }

    pub fn complete_node(&self, id: &str, output: String) -> Option<NodeState> {
        self.manager().record_success(id, output)
    }

    pub fn fail_node(&self, id: &str, error: NodeError) -> Option<(FailureDisposition, NodeState)> {
        self.manager().record_failure(id, error)
    }

    pub fn cancel_node(&self, id: &str) -> Option<NodeState> {
        self.manager().record_cancelled(id)
    }

    pub fn all_terminal(&self) -> bool {
        self.store.all_terminal()
    }

    /// Reset every node for another whole-graph repeat.
    pub fn reset(&self) {
        self.store.reset_all();
    }
}

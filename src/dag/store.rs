// src/dag/store.rs

//! Execution state store: one lock per node entry.
//!
//! The set of entries is fixed when the store is created from a graph, so the
//! outer map needs no lock. Each entry sits behind its own mutex; node tasks
//! only write their own entry, except for appending a completed parent's
//! output to a dependent, which goes through the dependent's lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::dag::node::NodeId;
use crate::dag::state::{NodeState, NodeStatus};

/// Snapshot form of the store, keyed by node id.
pub type StatesMap = BTreeMap<NodeId, NodeState>;

/// Result of merging a restored snapshot into a live store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Entries replaced from the snapshot.
    pub restored: Vec<NodeId>,
    /// Snapshot ids that are not part of this graph.
    pub unknown: Vec<NodeId>,
    /// Live entries left alone because a task currently owns them.
    pub skipped_running: Vec<NodeId>,
}

#[derive(Debug)]
pub struct StateStore {
    /// Submission order, used for snapshots and readiness scans.
    order: Vec<NodeId>,
    entries: HashMap<NodeId, Mutex<NodeState>>,
}

impl StateStore {
    /// Create a store with every node Pending.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        let order: Vec<NodeId> = ids.into_iter().map(Into::into).collect();
        let entries = order
            .iter()
            .map(|id| (id.clone(), Mutex::new(NodeState::pending(id.clone()))))
            .collect();
        Self { order, entries }
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Run `f` with exclusive access to one entry.
    ///
    /// Returns `None` for unknown ids. The lock is never held across an
    /// await point.
    pub fn with_entry<R>(&self, id: &str, f: impl FnOnce(&mut NodeState) -> R) -> Option<R> {
        let entry = self.entries.get(id)?;
        let mut guard = lock(entry);
        Some(f(&mut guard))
    }

    /// Clone of one entry.
    pub fn get(&self, id: &str) -> Option<NodeState> {
        self.with_entry(id, |s| s.clone())
    }

    pub fn status_of(&self, id: &str) -> Option<NodeStatus> {
        self.with_entry(id, |s| s.status)
    }

    /// Every entry, in submission order.
    pub fn snapshot(&self) -> Vec<NodeState> {
        self.order.iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn to_map(&self) -> StatesMap {
        self.snapshot()
            .into_iter()
            .map(|s| (s.node_id.clone(), s))
            .collect()
    }

    /// Whether every entry is Completed, Error or Blocked.
    pub fn all_terminal(&self) -> bool {
        self.order
            .iter()
            .all(|id| self.status_of(id).is_some_and(NodeStatus::is_terminal))
    }

    /// Reset every entry to a fresh Pending state (whole-graph repeat).
    pub fn reset_all(&self) {
        for id in &self.order {
            self.with_entry(id, |s| *s = NodeState::pending(id.clone()));
        }
        debug!(nodes = self.order.len(), "state store reset to pending");
    }

    /// Merge a restored snapshot into this store.
    ///
    /// - ids not present in the store are ignored;
    /// - entries currently Running are left untouched (their task still owns
    ///   them);
    /// - a restored Running state becomes Pending, since no task exists for
    ///   it in this process.
    pub fn merge(&self, restored: StatesMap) -> MergeReport {
        let mut report = MergeReport::default();

        for (id, mut state) in restored {
            let Some(entry) = self.entries.get(&id) else {
                warn!(node = %id, "restored state for unknown node; ignoring");
                report.unknown.push(id);
                continue;
            };

            let mut guard = lock(entry);
            if guard.status == NodeStatus::Running {
                warn!(node = %id, "node is running; keeping live state over restored one");
                report.skipped_running.push(id);
                continue;
            }

            if state.status == NodeStatus::Running {
                debug!(node = %id, "restored Running state re-enters Pending");
                state.status = NodeStatus::Pending;
            }
            state.node_id = id.clone();
            *guard = state;
            report.restored.push(id);
        }

        report
    }
}

fn lock(entry: &Mutex<NodeState>) -> MutexGuard<'_, NodeState> {
    // A panic while holding an entry lock leaves the state itself intact.
    entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

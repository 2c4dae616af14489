// src/dag/scheduler_step.rs

//! Result type for one readiness scan.

use crate::dag::node::NodeId;
use crate::dag::state::NodeState;

/// Structured result of a single scheduler scan.
///
/// Tests can drive the scheduler by hand and make assertions about what each
/// scan decided.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Ready nodes (Pending, every dependency Completed), in submission order.
    pub ready: Vec<NodeId>,
    /// Nodes this scan moved to Blocked.
    pub newly_blocked: Vec<NodeState>,
    /// Whether every node is terminal after this scan.
    pub all_terminal: bool,
}

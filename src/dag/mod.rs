// src/dag/mod.rs

//! Graph model, per-node state and scheduling.
//!
//! - [`node`] and [`request`] hold the immutable node model and its wire form.
//! - [`validate`] turns a submission into a [`Graph`] or rejects it.
//! - [`graph`] keeps adjacency and topological order.
//! - [`state`] and [`store`] hold the mutable per-node state of one execution.
//! - [`resolver`] resolves argument placeholders at dispatch time.
//! - [`state_manager`] applies state transitions.
//! - [`scheduler`] and [`scheduler_step`] run readiness scans.

pub mod graph;
pub mod node;
pub mod request;
pub mod resolver;
pub mod scheduler;
pub mod scheduler_step;
pub mod state;
pub mod state_manager;
pub mod store;
pub mod validate;

pub use graph::{DagGraph, Graph};
pub use node::{Node, NodeId, ReferenceKind, Value};
pub use request::{GraphRequest, RawArgs, RawNode};
pub use resolver::ReferenceResolver;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use state::{ErrorKind, NodeError, NodeState, NodeStatus};
pub use state_manager::{FailureDisposition, StateManager};
pub use store::{MergeReport, StateStore, StatesMap};
pub use validate::validate_request;

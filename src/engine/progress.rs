// src/engine/progress.rs

//! Converts state transitions into outbound [`EngineEvent`]s.

use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::{NodeState, StateStore};
use crate::engine::summary::{RunReport, RunSummary};
use crate::engine::{EngineEvent, ExecutionId};

/// Sends events for one execution.
///
/// A closed receiver is not an error: the caller may go away while the run
/// keeps going.
#[derive(Debug, Clone)]
pub struct ProgressEmitter {
    execution_id: ExecutionId,
    tx: mpsc::Sender<EngineEvent>,
}

impl ProgressEmitter {
    pub fn new(execution_id: impl Into<ExecutionId>, tx: mpsc::Sender<EngineEvent>) -> Self {
        Self {
            execution_id: execution_id.into(),
            tx,
        }
    }

    /// Full snapshot of every node.
    pub async fn progress(&self, store: &StateStore) {
        self.send(EngineEvent::Progress {
            execution_id: self.execution_id.clone(),
            nodes: store.snapshot(),
        })
        .await;
    }

    /// Terminal delta for one node.
    pub async fn node_finished(&self, node: NodeState) {
        self.send(EngineEvent::NodeFinished {
            execution_id: self.execution_id.clone(),
            node,
        })
        .await;
    }

    pub async fn summary(&self, summary: RunSummary) {
        self.send(EngineEvent::Summary(summary)).await;
    }

    pub async fn report(&self, report: RunReport) {
        self.send(EngineEvent::SummaryReport(report)).await;
    }

    async fn send(&self, event: EngineEvent) {
        if self.tx.send(event).await.is_err() {
            debug!(
                execution_id = %self.execution_id,
                "event receiver dropped; discarding event"
            );
        }
    }
}

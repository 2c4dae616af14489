// src/engine/execution.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::dag::{Graph, MergeReport, Scheduler, StateStore, StatesMap};
use crate::engine::ExecutionId;
use crate::engine::progress::ProgressEmitter;

/// One run of a submitted graph.
///
/// Holds the immutable graph, the concurrently-updated state store and the
/// control flags the dispatcher polls. Shared behind an `Arc` between the
/// controller and the dispatcher.
#[derive(Debug)]
pub struct Execution {
    id: ExecutionId,
    scheduler: Scheduler,
    emitter: ProgressEmitter,
    paused: AtomicBool,
    resumed: Notify,
    cancel: CancellationToken,
    repeat_index: AtomicU32,
    finished: AtomicBool,
}

impl Execution {
    pub fn new(id: impl Into<ExecutionId>, graph: Arc<Graph>, emitter: ProgressEmitter) -> Self {
        let store = Arc::new(StateStore::new(graph.node_ids()));
        Self {
            id: id.into(),
            scheduler: Scheduler::new(graph, store),
            emitter,
            paused: AtomicBool::new(false),
            resumed: Notify::new(),
            cancel: CancellationToken::new(),
            repeat_index: AtomicU32::new(1),
            finished: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn graph(&self) -> &Arc<Graph> {
        self.scheduler.graph()
    }

    pub fn store(&self) -> &Arc<StateStore> {
        self.scheduler.store()
    }

    pub fn emitter(&self) -> &ProgressEmitter {
        &self.emitter
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Stop dispatching new nodes; running ones continue.
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            info!(execution_id = %self.id, "execution paused");
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            info!(execution_id = %self.id, "execution resumed");
            self.resumed.notify_waiters();
        }
    }

    /// Woken by every [`resume`](Self::resume) that clears the pause.
    pub fn resume_signal(&self) -> &Notify {
        &self.resumed
    }

    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            info!(execution_id = %self.id, "execution cancellation requested");
            self.cancel.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// 1-based index of the whole-graph repeat in progress.
    pub fn repeat_index(&self) -> u32 {
        self.repeat_index.load(Ordering::SeqCst)
    }

    pub fn repeat_total(&self) -> u32 {
        self.graph().repeat()
    }

    pub(crate) fn set_repeat_index(&self, index: u32) {
        self.repeat_index.store(index, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    /// Merge restored states into the live store.
    pub fn restore(&self, states: StatesMap) -> MergeReport {
        let report = self.store().merge(states);
        info!(
            execution_id = %self.id,
            restored = report.restored.len(),
            unknown = report.unknown.len(),
            skipped_running = report.skipped_running.len(),
            "restored checkpoint into execution"
        );
        report
    }
}

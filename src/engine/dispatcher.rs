// src/engine/dispatcher.rs

//! The coordinating loop of one execution.
//!
//! Each pass:
//! 1. reaps finished parallel tasks;
//! 2. propagates `Blocked` and collects ready nodes (submission order);
//! 3. unless paused, dispatches them: parallel nodes are spawned into the
//!    execution's task set, non-parallel nodes run inline so they finish
//!    before the next candidate is considered;
//! 4. waits for the poll interval, a task completion, a resume, or
//!    cancellation.
//!
//! The loop ends when every node is terminal or the execution is cancelled.
//! Every spawned task is joined (or aborted after the shutdown grace) before
//! [`Dispatcher::run`] returns.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::dag::{NodeId, NodeStatus};
use crate::engine::EngineOptions;
use crate::engine::execution::Execution;
use crate::engine::node_task::{NodeTask, recover_lost_task};
use crate::exec::RemoteExecutor;

/// How one dispatcher run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The run stopped because it was cancelled, not because every node
    /// became terminal.
    pub cancelled: bool,
    /// Readiness scans performed.
    pub passes: u64,
}

pub struct Dispatcher {
    execution: Arc<Execution>,
    node_task: NodeTask,
    poll_interval: Duration,
    shutdown_grace: Duration,
    tasks: JoinSet<()>,
    /// Which node each spawned task is running.
    task_nodes: HashMap<Id, NodeId>,
}

impl Dispatcher {
    pub fn new(
        execution: Arc<Execution>,
        executor: Arc<dyn RemoteExecutor>,
        options: &EngineOptions,
    ) -> Self {
        let node_task = NodeTask::new(
            Arc::clone(&execution),
            executor,
            Arc::new(options.script_dir.clone()),
        );
        Self {
            execution,
            node_task,
            poll_interval: options.poll_interval,
            shutdown_grace: options.shutdown_grace,
            tasks: JoinSet::new(),
            task_nodes: HashMap::new(),
        }
    }

    /// Drive the execution until every node is terminal or it is cancelled.
    pub async fn run(mut self) -> DispatchOutcome {
        let execution_id = self.execution.id().to_string();
        info!(
            execution_id = %execution_id,
            nodes = self.execution.graph().len(),
            repeat = self.execution.repeat_index(),
            "dispatcher started"
        );

        let mut passes: u64 = 0;
        let cancelled = loop {
            if self.execution.is_cancelled() {
                break true;
            }

            while let Some(joined) = self.tasks.try_join_next_with_id() {
                self.reap(joined).await;
            }

            passes += 1;
            let step = self.execution.scheduler().scan();

            if !step.newly_blocked.is_empty() {
                for state in step.newly_blocked {
                    self.execution.emitter().node_finished(state).await;
                }
                self.execution
                    .emitter()
                    .progress(self.execution.store())
                    .await;
            }

            if step.all_terminal && self.tasks.is_empty() {
                break false;
            }

            if !self.execution.is_paused() {
                for id in &step.ready {
                    if self.execution.is_cancelled() || self.execution.is_paused() {
                        break;
                    }
                    self.dispatch(id).await;
                }
            } else if !step.ready.is_empty() {
                debug!(execution_id = %execution_id, ready = ?step.ready, "paused; holding ready nodes");
            }

            // Enabled before the flag is read; notify_waiters keeps no permit.
            let execution = Arc::clone(&self.execution);
            let resumed = execution.resume_signal().notified();
            tokio::pin!(resumed);
            resumed.as_mut().enable();
            let paused = execution.is_paused();
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                Some(joined) = self.tasks.join_next_with_id(), if !self.tasks.is_empty() => {
                    self.reap(joined).await;
                }
                _ = &mut resumed, if paused => {}
                _ = execution.cancel_token().cancelled() => {}
            }
        };

        if cancelled {
            self.shutdown().await;
        } else {
            while let Some(joined) = self.tasks.join_next_with_id().await {
                self.reap(joined).await;
            }
        }

        info!(
            execution_id = %execution_id,
            cancelled,
            passes,
            "dispatcher finished"
        );
        DispatchOutcome { cancelled, passes }
    }

    async fn dispatch(&mut self, id: &str) {
        let Some(parallel) = self.execution.graph().node(id).map(|n| n.parallel) else {
            return;
        };

        let Some(started) = self.execution.scheduler().start_node(id) else {
            return;
        };
        self.execution
            .emitter()
            .progress(self.execution.store())
            .await;

        let task = self.node_task.clone();
        if parallel {
            let handle = self.tasks.spawn(task.run(started));
            self.task_nodes.insert(handle.id(), id.to_string());
        } else {
            task.run(started).await;
        }
    }

    async fn reap(&mut self, joined: Result<(Id, ()), JoinError>) {
        match joined {
            Ok((task_id, ())) => {
                self.task_nodes.remove(&task_id);
            }
            Err(err) => {
                let Some(node) = self.task_nodes.remove(&err.id()) else {
                    return;
                };
                let cause = if err.is_panic() {
                    "node task panicked"
                } else {
                    "node task aborted"
                };
                warn!(
                    execution_id = %self.execution.id(),
                    node = %node,
                    error = %err,
                    "node task ended without recording an outcome"
                );
                recover_lost_task(&self.execution, &node, cause).await;
            }
        }
    }

    /// Join outstanding tasks within the shutdown grace, abort the rest, and
    /// return any node still Running to Pending.
    async fn shutdown(&mut self) {
        if !self.tasks.is_empty() {
            info!(
                execution_id = %self.execution.id(),
                outstanding = self.tasks.len(),
                grace_ms = self.shutdown_grace.as_millis() as u64,
                "waiting for in-flight node tasks"
            );
        }

        let grace = tokio::time::sleep(self.shutdown_grace);
        tokio::pin!(grace);

        loop {
            tokio::select! {
                joined = self.tasks.join_next_with_id() => match joined {
                    Some(joined) => self.reap(joined).await,
                    None => break,
                },
                _ = &mut grace => {
                    warn!(
                        execution_id = %self.execution.id(),
                        outstanding = self.tasks.len(),
                        "shutdown grace elapsed; aborting node tasks"
                    );
                    self.tasks.abort_all();
                    while let Some(joined) = self.tasks.join_next_with_id().await {
                        self.reap(joined).await;
                    }
                    break;
                }
            }
        }

        let scheduler = self.execution.scheduler();
        let stranded: Vec<NodeId> = scheduler
            .store()
            .ids()
            .iter()
            .filter(|id| scheduler.store().status_of(id) == Some(NodeStatus::Running))
            .cloned()
            .collect();
        for id in &stranded {
            scheduler.cancel_node(id);
        }
        if !stranded.is_empty() {
            debug!(execution_id = %self.execution.id(), ?stranded, "returned stranded nodes to pending");
        }

        self.execution
            .emitter()
            .progress(self.execution.store())
            .await;
    }
}

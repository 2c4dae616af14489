// src/engine/node_task.rs

//! One node attempt: invoke the executor `repeat_count` times under the
//! node's timeout, then apply the outcome to the state store.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info};

use crate::dag::{ErrorKind, FailureDisposition, Node, NodeError, NodeState, NodeStatus};
use crate::engine::execution::Execution;
use crate::exec::{ExecError, Invocation, RemoteExecutor, build_command_line};

/// Everything a node task needs; cheap to clone into spawned tasks.
#[derive(Clone)]
pub struct NodeTask {
    execution: Arc<Execution>,
    executor: Arc<dyn RemoteExecutor>,
    script_dir: Arc<PathBuf>,
}

impl NodeTask {
    pub fn new(
        execution: Arc<Execution>,
        executor: Arc<dyn RemoteExecutor>,
        script_dir: Arc<PathBuf>,
    ) -> Self {
        Self {
            execution,
            executor,
            script_dir,
        }
    }

    /// Run an attempt for a node that was already marked Running, then
    /// record its outcome.
    ///
    /// Never panics outward: a panic inside the attempt is recorded as an
    /// `Internal` error on the node.
    pub async fn run(self, started: NodeState) {
        let id = started.node_id.clone();
        let Some(node) = self.execution.graph().node(&id).cloned() else {
            error!(node = %id, "node task started for unknown node");
            return;
        };

        let outcome = AssertUnwindSafe(self.attempt(&node, &started.resolved_args))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ExecError::Internal(format!(
                    "node task panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });

        self.apply(&node, outcome).await;
    }

    async fn attempt(&self, node: &Node, resolved_args: &[String]) -> Result<String, ExecError> {
        let command_line = build_command_line(
            &node.id,
            node.script.as_deref(),
            resolved_args,
            &self.script_dir,
        );
        let connection = self.execution.graph().connection();

        let mut output = String::new();
        for iteration in 1..=node.repeat_count {
            let invocation = Invocation::new(
                node.timeout,
                self.execution.cancel_token().child_token(),
            );
            let deadline = invocation.deadline;

            debug!(
                execution_id = %self.execution.id(),
                node = %node.id,
                iteration,
                times = node.repeat_count,
                executor = self.executor.name(),
                command = %command_line,
                "invoking executor"
            );

            // The executor is expected to honour the deadline itself; the
            // outer timeout covers executors that do not.
            let call = self.executor.execute(connection, &command_line, invocation);
            output = match tokio::time::timeout_at(deadline, call).await {
                Ok(result) => result?,
                Err(_elapsed) => return Err(ExecError::Timeout(node.timeout)),
            };
        }

        Ok(output)
    }

    async fn apply(&self, node: &Node, outcome: Result<String, ExecError>) {
        let scheduler = self.execution.scheduler();
        let emitter = self.execution.emitter();

        let finished = match outcome {
            Ok(output) => scheduler.complete_node(&node.id, output),
            Err(ExecError::Cancelled) if self.execution.is_cancelled() => {
                scheduler.cancel_node(&node.id);
                None
            }
            Err(err) => match scheduler.fail_node(&node.id, err.to_node_error()) {
                Some((FailureDisposition::Exhausted, state)) => Some(state),
                Some((FailureDisposition::Retry, _)) => None,
                None => None,
            },
        };

        if let Some(state) = finished {
            info!(
                execution_id = %self.execution.id(),
                node = %node.id,
                status = state.status.as_str(),
                "node finished"
            );
            emitter.node_finished(state).await;
        }
        emitter.progress(scheduler.store()).await;
    }
}

/// Record an attempt whose task died without applying an outcome (aborted
/// or panicked outside the attempt).
pub(crate) async fn recover_lost_task(execution: &Execution, id: &str, cause: &str) {
    let scheduler = execution.scheduler();
    if scheduler.store().status_of(id) != Some(NodeStatus::Running) {
        return;
    }

    if execution.is_cancelled() {
        scheduler.cancel_node(id);
    } else if let Some((FailureDisposition::Exhausted, state)) =
        scheduler.fail_node(id, NodeError::new(ErrorKind::Internal, cause))
    {
        execution.emitter().node_finished(state).await;
    }
    execution.emitter().progress(scheduler.store()).await;
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

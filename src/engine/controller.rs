// src/engine/controller.rs

//! Run controller: the public face of the engine.
//!
//! Submissions are validated synchronously; a rejected graph never creates
//! an execution. Accepted graphs run on a spawned task that loops the
//! dispatcher once per whole-graph repeat.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::checkpoint::{CheckpointStore, Checkpointer, checkpoint_key};
use crate::dag::{GraphRequest, MergeReport, NodeState, StatesMap, validate_request};
use crate::engine::dispatcher::Dispatcher;
use crate::engine::execution::Execution;
use crate::engine::progress::ProgressEmitter;
use crate::engine::summary::{RunReport, RunSummary};
use crate::engine::{EngineEvent, EngineOptions, ExecutionId};
use crate::errors::{NodeflowError, Result};
use crate::exec::RemoteExecutor;

/// A submitted execution and the task running it.
#[derive(Debug)]
pub struct ExecutionHandle {
    pub id: ExecutionId,
    join: JoinHandle<RunReport>,
}

impl ExecutionHandle {
    /// Wait for every repeat to finish and return the final report.
    pub async fn wait(self) -> Result<RunReport> {
        self.join
            .await
            .map_err(|e| NodeflowError::Other(anyhow::anyhow!("execution task failed: {e}")))
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

pub struct RunController {
    executor: Arc<dyn RemoteExecutor>,
    checkpointer: Checkpointer,
    options: EngineOptions,
    executions: Mutex<HashMap<ExecutionId, Arc<Execution>>>,
}

impl RunController {
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        checkpoints: Arc<dyn CheckpointStore>,
        options: EngineOptions,
    ) -> Self {
        Self {
            executor,
            checkpointer: Checkpointer::new(checkpoints),
            options,
            executions: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Validate and start a graph. Events for the new execution go to
    /// `events`.
    pub fn submit(
        &self,
        request: GraphRequest,
        events: mpsc::Sender<EngineEvent>,
    ) -> Result<ExecutionHandle> {
        self.submit_with_states(request, events, StatesMap::new())
    }

    /// Like [`submit`](Self::submit), but merges `restored` into the fresh
    /// state store before the first dispatch.
    pub fn submit_with_states(
        &self,
        request: GraphRequest,
        events: mpsc::Sender<EngineEvent>,
        restored: StatesMap,
    ) -> Result<ExecutionHandle> {
        let graph = Arc::new(validate_request(
            request,
            self.executor.requires_connection(),
        )?);

        let id = Uuid::new_v4().to_string();
        let emitter = ProgressEmitter::new(id.clone(), events);
        let execution = Arc::new(Execution::new(id.clone(), graph, emitter));
        if !restored.is_empty() {
            execution.restore(restored);
        }

        self.lock_executions()
            .insert(id.clone(), Arc::clone(&execution));

        info!(
            execution_id = %id,
            nodes = execution.graph().len(),
            repeat = execution.repeat_total(),
            executor = self.executor.name(),
            "execution submitted"
        );

        let join = tokio::spawn(run_execution(
            execution,
            Arc::clone(&self.executor),
            self.options.clone(),
        ));

        Ok(ExecutionHandle { id, join })
    }

    pub fn execution(&self, id: &str) -> Result<Arc<Execution>> {
        self.lock_executions()
            .get(id)
            .cloned()
            .ok_or_else(|| NodeflowError::UnknownExecution(id.to_string()))
    }

    pub fn pause(&self, id: &str) -> Result<()> {
        self.execution(id)?.pause();
        Ok(())
    }

    pub fn resume(&self, id: &str) -> Result<()> {
        self.execution(id)?.resume();
        Ok(())
    }

    /// Stop launching new work and abort in-flight invocations. The run's
    /// summary reports `cancelled` unless every node had already completed.
    pub fn cancel(&self, id: &str) -> Result<()> {
        self.execution(id)?.cancel();
        Ok(())
    }

    /// Current per-node states, in submission order.
    pub fn states(&self, id: &str) -> Result<Vec<NodeState>> {
        Ok(self.execution(id)?.store().snapshot())
    }

    /// Save the execution's states map; returns the checkpoint key.
    pub fn save_checkpoint(&self, id: &str) -> Result<String> {
        let execution = self.execution(id)?;
        let key = checkpoint_key(id);
        self.checkpointer.save(&key, &execution.store().to_map())?;
        Ok(key)
    }

    /// States map saved for `id`; empty when nothing was saved.
    pub fn load_checkpoint(&self, id: &str) -> Result<StatesMap> {
        self.checkpointer.load(&checkpoint_key(id))
    }

    /// Merge the checkpoint saved for `from` into the live execution
    /// `target`.
    pub fn restore(&self, target: &str, from: &str) -> Result<MergeReport> {
        let execution = self.execution(target)?;
        let states = self.load_checkpoint(from)?;
        Ok(execution.restore(states))
    }

    /// Drop the controller's reference to an execution, cancelling it if it
    /// is still running.
    pub fn forget(&self, id: &str) {
        if let Some(execution) = self.lock_executions().remove(id) {
            if !execution.is_finished() {
                warn!(execution_id = %id, "forgetting unfinished execution; cancelling it");
                execution.cancel();
            }
        }
    }

    pub fn execution_ids(&self) -> Vec<ExecutionId> {
        let mut ids: Vec<_> = self.lock_executions().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn lock_executions(&self) -> MutexGuard<'_, HashMap<ExecutionId, Arc<Execution>>> {
        self.executions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Run every whole-graph repeat of `execution` and emit the summaries.
async fn run_execution(
    execution: Arc<Execution>,
    executor: Arc<dyn RemoteExecutor>,
    options: EngineOptions,
) -> RunReport {
    let repeat_total = execution.repeat_total();
    let graph = Arc::clone(execution.graph());
    let mut summaries = Vec::with_capacity(repeat_total as usize);

    for repeat in 1..=repeat_total {
        execution.set_repeat_index(repeat);
        if repeat > 1 {
            execution.scheduler().reset();
            info!(execution_id = %execution.id(), repeat, repeat_total, "starting graph repeat");
        }
        execution.emitter().progress(execution.store()).await;

        let outcome = Dispatcher::new(Arc::clone(&execution), Arc::clone(&executor), &options)
            .run()
            .await;

        let summary = RunSummary::build(
            execution.id(),
            repeat,
            repeat_total,
            &graph,
            &execution.store().snapshot(),
            outcome.cancelled,
        );
        info!(
            execution_id = %execution.id(),
            repeat,
            repeat_total,
            status = %summary.status,
            "run summary"
        );
        execution.emitter().summary(summary.clone()).await;
        summaries.push(summary);

        if outcome.cancelled {
            break;
        }
    }

    let report = RunReport::from_summaries(
        execution.id(),
        repeat_total,
        graph.node_ids().map(str::to_string).collect(),
        summaries,
    );
    info!(execution_id = %execution.id(), status = %report.status, "execution finished");
    execution.mark_finished();
    execution.emitter().report(report.clone()).await;
    report
}

#![allow(dead_code)]

use std::sync::Arc;

use nodeflow::checkpoint::MemoryCheckpointStore;
use nodeflow::engine::RunController;
use nodeflow_test_utils::{ScriptedExecutor, fast_options};

pub use nodeflow_test_utils::{init_tracing, with_timeout};

/// Controller over a scripted executor and an in-memory checkpoint store.
pub fn controller(executor: ScriptedExecutor) -> (Arc<RunController>, Arc<ScriptedExecutor>) {
    controller_with_store(executor, MemoryCheckpointStore::new())
}

pub fn controller_with_store(
    executor: ScriptedExecutor,
    store: MemoryCheckpointStore,
) -> (Arc<RunController>, Arc<ScriptedExecutor>) {
    let executor = Arc::new(executor);
    let controller = RunController::new(executor.clone(), Arc::new(store), fast_options());
    (Arc::new(controller), executor)
}

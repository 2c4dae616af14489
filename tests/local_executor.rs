// tests/local_executor.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout};

use std::sync::Arc;
use std::time::{Duration, Instant};

use nodeflow::checkpoint::MemoryCheckpointStore;
use nodeflow::engine::{AggregateStatus, RunController};
use nodeflow::exec::{ExecError, Invocation, LocalShellExecutor, RemoteExecutor};
use nodeflow_test_utils::{EventLog, GraphBuilder, NodeBuilder, fast_options};
use tokio_util::sync::CancellationToken;

fn invocation(timeout: Duration) -> Invocation {
    Invocation::new(timeout, CancellationToken::new())
}

#[tokio::test]
async fn captures_stdout() {
    init_tracing();
    let out = LocalShellExecutor::new()
        .execute(None, "echo hello", invocation(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(out, "hello\n");
}

#[tokio::test]
async fn falls_back_to_stderr_when_stdout_is_blank() {
    let out = LocalShellExecutor::new()
        .execute(None, "echo oops 1>&2", invocation(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(out, "oops\n");
}

#[tokio::test]
async fn non_zero_exit_is_reported_with_output() {
    let err = LocalShellExecutor::new()
        .execute(None, "echo broken; exit 3", invocation(Duration::from_secs(5)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ExecError::NonZeroExit {
            code: 3,
            output: "broken\n".into()
        }
    );
}

#[tokio::test]
async fn deadline_kills_long_commands() {
    let started = Instant::now();
    let err = LocalShellExecutor::new()
        .execute(None, "sleep 30", invocation(Duration::from_millis(200)))
        .await
        .unwrap_err();
    assert_eq!(err, ExecError::Timeout(Duration::from_millis(200)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn cancellation_stops_the_command() {
    let token = CancellationToken::new();
    let executor = LocalShellExecutor::new();
    let call = executor.execute(
        None,
        "sleep 30",
        Invocation::new(Duration::from_secs(60), token.clone()),
    );

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let err = with_timeout(call).await.unwrap_err();
    assert_eq!(err, ExecError::Cancelled);
    canceller.await.unwrap();
}

#[tokio::test]
async fn oversized_timeout_is_capped_instead_of_overflowing() {
    let inv = invocation(Duration::from_secs(u64::MAX));
    assert!(inv.deadline > tokio::time::Instant::now());
    assert_eq!(inv.timeout, Duration::from_secs(u64::MAX));

    let out = LocalShellExecutor::new()
        .execute(None, "echo ok", inv)
        .await
        .unwrap();
    assert_eq!(out, "ok\n");
}

#[tokio::test]
async fn node_with_huge_timeout_runs_locally() {
    init_tracing();
    let executor: Arc<dyn RemoteExecutor> = Arc::new(LocalShellExecutor::new());
    let controller = RunController::new(
        executor,
        Arc::new(MemoryCheckpointStore::new()),
        fast_options(),
    );

    let graph = GraphBuilder::new()
        .node(
            NodeBuilder::new("A")
                .cmd("true")
                .timeout_secs(u64::MAX)
                .max_retries(0),
        )
        .build();

    let (tx, _log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    let report = with_timeout(handle.wait()).await.unwrap();
    assert_eq!(report.status, AggregateStatus::Completed);
}

#[tokio::test]
async fn outputs_flow_between_real_processes() {
    init_tracing();
    let executor: Arc<dyn RemoteExecutor> = Arc::new(LocalShellExecutor::new());
    let controller = RunController::new(
        executor,
        Arc::new(MemoryCheckpointStore::new()),
        fast_options(),
    );

    let graph = GraphBuilder::new()
        .node(NodeBuilder::new("A").cmd("echo").arg("first"))
        .node(
            NodeBuilder::new("B")
                .cmd("echo")
                .arg("got")
                .arg("$parent.output")
                .after("A"),
        )
        .build();

    let (tx, _log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    let id = handle.id.clone();
    let report = with_timeout(handle.wait()).await.unwrap();

    assert_eq!(report.status, AggregateStatus::Completed);
    let states = controller.states(&id).unwrap();
    assert_eq!(states[1].output.as_deref(), Some("got first\n"));
}

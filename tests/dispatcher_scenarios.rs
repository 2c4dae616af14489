// tests/dispatcher_scenarios.rs

mod common;
use crate::common::{controller, init_tracing, with_timeout};

use std::time::Duration;

use nodeflow::dag::{ErrorKind, NodeStatus};
use nodeflow::engine::AggregateStatus;
use nodeflow::exec::ExecError;
use nodeflow_test_utils::{EventLog, Gate, GraphBuilder, NodeBuilder, NodeScript, ScriptedExecutor};

#[tokio::test]
async fn linear_chain_with_failing_middle_node_fails() {
    init_tracing();
    let (controller, executor) = controller(ScriptedExecutor::new().fail_always("B"));

    let graph = GraphBuilder::new()
        .node(NodeBuilder::new("A"))
        .node(NodeBuilder::new("B").after("A").max_retries(0))
        .node(NodeBuilder::new("C").after("B"))
        .build();

    let (tx, log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    let id = handle.id.clone();
    let report = with_timeout(handle.wait()).await.unwrap();

    let states = controller.states(&id).unwrap();
    let status = |n: &str| states.iter().find(|s| s.node_id == n).unwrap().status;
    assert_eq!(status("A"), NodeStatus::Completed);
    assert_eq!(status("B"), NodeStatus::Error);
    assert_eq!(status("C"), NodeStatus::Blocked);

    assert_eq!(report.status, AggregateStatus::Failed);
    let summary = &report.summaries[0];
    assert_eq!(summary.status, AggregateStatus::Failed);
    assert_eq!(summary.node_ids, vec!["A", "B", "C"]);
    assert_eq!(summary.error.as_ref().unwrap().kind, ErrorKind::NonZeroExit);
    assert!(summary.start_time.unwrap() <= summary.end_time.unwrap());

    assert_eq!(executor.calls_for("B").len(), 1);
    assert!(executor.calls_for("C").is_empty());

    let finished: Vec<_> = with_timeout(async {
        log.wait_for_report().await;
        log.node_finished()
    })
    .await
    .into_iter()
    .map(|s| (s.node_id, s.status))
    .collect();
    assert!(finished.contains(&("C".to_string(), NodeStatus::Blocked)));
}

#[tokio::test]
async fn parallel_children_start_together_and_exclusive_nodes_serialize() {
    init_tracing();
    let gate = Gate::new();
    let (controller, executor) = controller(
        ScriptedExecutor::new()
            .gated("B", &gate)
            .gated("C", &gate)
            .delay("A", Duration::from_millis(30))
            .delay("D", Duration::from_millis(30)),
    );

    let graph = GraphBuilder::new()
        .node(NodeBuilder::new("A"))
        .node(NodeBuilder::new("B").after("A").parallel(true))
        .node(NodeBuilder::new("C").after("A").parallel(true))
        .node(NodeBuilder::new("D"))
        .build();

    let (tx, _log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    let id = handle.id.clone();

    // B and C are both in flight at once while the gate is closed.
    with_timeout(executor.wait_for_in_flight(2)).await;
    let states = controller.states(&id).unwrap();
    let running: Vec<_> = states
        .iter()
        .filter(|s| s.status == NodeStatus::Running)
        .map(|s| s.node_id.as_str())
        .collect();
    assert_eq!(running, vec!["B", "C"]);

    gate.open();
    let report = with_timeout(handle.wait()).await.unwrap();
    assert_eq!(report.status, AggregateStatus::Completed);

    // A and D never overlapped: D ran after A finished.
    let a = &executor.calls_for("A")[0];
    let d = &executor.calls_for("D")[0];
    assert!(d.started >= a.finished);
    assert_eq!(executor.max_in_flight(), 2);
}

#[tokio::test]
async fn dependencies_finish_before_dependents_start() {
    init_tracing();
    let (controller, executor) = controller(
        ScriptedExecutor::new()
            .delay("A", Duration::from_millis(20))
            .delay("B", Duration::from_millis(40)),
    );

    let graph = GraphBuilder::new()
        .node(NodeBuilder::new("A").parallel(true))
        .node(NodeBuilder::new("B").parallel(true))
        .node(NodeBuilder::new("C").after("A").after("B").parallel(true))
        .build();

    let (tx, _log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    let id = handle.id.clone();
    with_timeout(handle.wait()).await.unwrap();

    let c_call = &executor.calls_for("C")[0];
    for dep in ["A", "B"] {
        assert!(c_call.started >= executor.calls_for(dep)[0].finished);
    }

    let states = controller.states(&id).unwrap();
    let get = |n: &str| states.iter().find(|s| s.node_id == n).unwrap().clone();
    let c = get("C");
    for dep in ["A", "B"] {
        assert!(c.start_time.unwrap() >= get(dep).end_time.unwrap());
    }
}

#[tokio::test]
async fn always_failing_node_runs_max_retries_plus_one_times() {
    init_tracing();
    let (controller, executor) = controller(ScriptedExecutor::new().fail_always("A"));

    let graph = GraphBuilder::new()
        .node(NodeBuilder::new("A").max_retries(2))
        .build();

    let (tx, _log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    let id = handle.id.clone();
    let report = with_timeout(handle.wait()).await.unwrap();

    assert_eq!(executor.calls_for("A").len(), 3);
    let a = &controller.states(&id).unwrap()[0];
    assert_eq!(a.status, NodeStatus::Error);
    assert_eq!(a.retry_count, 2);
    assert_eq!(a.attempts, 3);
    assert_eq!(report.status, AggregateStatus::Failed);
}

#[tokio::test]
async fn transient_failure_recovers_within_retry_budget() {
    init_tracing();
    let (controller, executor) = controller(ScriptedExecutor::new().fail_times("A", 2));

    let graph = GraphBuilder::new()
        .node(NodeBuilder::new("A").max_retries(3))
        .node(NodeBuilder::new("B").after("A"))
        .build();

    let (tx, _log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    let id = handle.id.clone();
    let report = with_timeout(handle.wait()).await.unwrap();

    assert_eq!(report.status, AggregateStatus::Completed);
    assert_eq!(executor.calls_for("A").len(), 3);
    let a = &controller.states(&id).unwrap()[0];
    assert_eq!(a.retry_count, 2);
    assert!(a.error.is_none());
}

#[tokio::test]
async fn timeout_is_enforced_and_retried() {
    init_tracing();
    let (controller, executor) =
        controller(ScriptedExecutor::new().delay("A", Duration::from_secs(30)));

    let graph = GraphBuilder::new()
        .node(NodeBuilder::new("A").timeout_secs(1).max_retries(1))
        .build();

    let (tx, _log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    let id = handle.id.clone();
    let report = tokio::time::timeout(Duration::from_secs(10), handle.wait())
        .await
        .expect("run did not finish")
        .unwrap();

    assert_eq!(report.status, AggregateStatus::Failed);
    let calls = executor.calls_for("A");
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.result == Err(ExecError::Timeout(Duration::from_secs(1)))));

    let a = &controller.states(&id).unwrap()[0];
    assert_eq!(a.error.as_ref().unwrap().kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn times_repeats_invocations_and_keeps_last_output() {
    init_tracing();
    let (controller, executor) = controller(ScriptedExecutor::new());

    let graph = GraphBuilder::new()
        .node(NodeBuilder::new("A").arg("x").times(3))
        .node(NodeBuilder::new("B").arg("$parent.output").after("A"))
        .build();

    let (tx, _log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    let id = handle.id.clone();
    with_timeout(handle.wait()).await.unwrap();

    assert_eq!(executor.calls_for("A").len(), 3);
    let states = controller.states(&id).unwrap();
    assert_eq!(states[0].output.as_deref(), Some("A 'x'"));
    assert_eq!(states[0].attempts, 1);

    // B received A's output as a quoted argument.
    assert_eq!(executor.calls_for("B")[0].command_line, "B 'A '\\''x'\\'''");
}

#[tokio::test]
async fn failing_iteration_of_times_fails_the_attempt() {
    init_tracing();
    let (controller, executor) = controller(ScriptedExecutor::new().fail_times("A", 1));

    let graph = GraphBuilder::new()
        .node(NodeBuilder::new("A").times(2).max_retries(1))
        .build();

    let (tx, _log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    let id = handle.id.clone();
    let report = with_timeout(handle.wait()).await.unwrap();

    // First attempt fails on its first iteration; the retry runs twice.
    assert_eq!(executor.calls_for("A").len(), 3);
    assert_eq!(report.status, AggregateStatus::Completed);
    assert_eq!(controller.states(&id).unwrap()[0].retry_count, 1);
}

#[tokio::test]
async fn panicking_executor_is_recorded_as_internal_error() {
    init_tracing();
    let (controller, _executor) = controller(ScriptedExecutor::new().script(
        "A",
        NodeScript {
            panic: true,
            ..NodeScript::default()
        },
    ));

    let graph = GraphBuilder::new()
        .node(NodeBuilder::new("A").max_retries(0).parallel(true))
        .node(NodeBuilder::new("B"))
        .build();

    let (tx, _log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    let id = handle.id.clone();
    let report = with_timeout(handle.wait()).await.unwrap();

    let states = controller.states(&id).unwrap();
    assert_eq!(states[0].status, NodeStatus::Error);
    assert_eq!(states[0].error.as_ref().unwrap().kind, ErrorKind::Internal);
    // The independent branch still completed.
    assert_eq!(states[1].status, NodeStatus::Completed);
    assert_eq!(report.status, AggregateStatus::Partial);
}

#[tokio::test]
async fn progress_events_cover_every_transition() {
    init_tracing();
    let (controller, _executor) = controller(ScriptedExecutor::new().fail_times("A", 1));

    let graph = GraphBuilder::new()
        .node(NodeBuilder::new("A").max_retries(1))
        .build();

    let (tx, log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    with_timeout(handle.wait()).await.unwrap();
    let report = with_timeout(log.wait_for_report()).await;

    assert!(log.saw_status("A", NodeStatus::Pending));
    assert!(log.saw_status("A", NodeStatus::Running));
    assert!(log.saw_status("A", NodeStatus::Completed));

    let finished = log.node_finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].status, NodeStatus::Completed);

    assert_eq!(log.summaries().len(), 1);
    assert_eq!(report.status, AggregateStatus::Completed);
}

#[tokio::test]
async fn huge_timeout_still_runs_the_command() {
    init_tracing();
    let (controller, executor) = controller(ScriptedExecutor::new());

    let graph = GraphBuilder::new()
        .node(NodeBuilder::new("A").timeout_secs(u64::MAX).max_retries(0))
        .build();

    let (tx, _log) = EventLog::channel();
    let handle = controller.submit(graph, tx).unwrap();
    let id = handle.id.clone();
    let report = with_timeout(handle.wait()).await.unwrap();

    assert_eq!(report.status, AggregateStatus::Completed);
    assert_eq!(executor.calls_for("A").len(), 1);
    let a = &controller.states(&id).unwrap()[0];
    assert_eq!(a.status, NodeStatus::Completed);
    assert!(a.error.is_none());
}

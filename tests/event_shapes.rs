// tests/event_shapes.rs

use nodeflow::dag::{ErrorKind, NodeError, NodeState, NodeStatus};
use nodeflow::engine::{AggregateStatus, EngineEvent, RunReport, RunSummary};
use nodeflow::session::{ControlReply, ServerMessage};
use nodeflow_test_utils::{GraphBuilder, NodeBuilder};
use serde_json::json;

fn summary(status: AggregateStatus, repeat: u32) -> RunSummary {
    let graph = GraphBuilder::new().node(NodeBuilder::new("A")).build_graph();
    let mut state = NodeState::pending("A");
    state.status = match status {
        AggregateStatus::Completed => NodeStatus::Completed,
        AggregateStatus::Failed => NodeStatus::Error,
        _ => NodeStatus::Pending,
    };
    if state.status == NodeStatus::Error {
        state.error = Some(NodeError::new(ErrorKind::NonZeroExit, "exit 1"));
    }
    RunSummary::build(
        "e1",
        repeat,
        3,
        &graph,
        &[state],
        status == AggregateStatus::Cancelled,
    )
}

#[test]
fn progress_event_is_tagged_and_camel_cased() {
    let event = EngineEvent::Progress {
        execution_id: "e1".into(),
        nodes: vec![NodeState::pending("A")],
    };
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["type"], "progress");
    assert_eq!(value["executionId"], "e1");
    assert_eq!(value["nodes"][0]["nodeId"], "A");
    assert_eq!(value["nodes"][0]["status"], "pending");
    assert_eq!(value["nodes"][0]["retryCount"], 0);
}

#[test]
fn summary_events_flatten_their_payload() {
    let value = serde_json::to_value(EngineEvent::Summary(summary(
        AggregateStatus::Failed,
        1,
    )))
    .unwrap();

    assert_eq!(value["type"], "summary");
    assert_eq!(value["executionId"], "e1");
    assert_eq!(value["repeatTotal"], 3);
    assert_eq!(value["status"], "failed");
    assert_eq!(value["error"]["kind"], "non_zero_exit");
    assert_eq!(value["nodeIds"], json!(["A"]));
}

#[test]
fn report_status_folds_repeats() {
    let completed = |n| summary(AggregateStatus::Completed, n);
    let failed = |n| summary(AggregateStatus::Failed, n);
    let cancelled = |n| summary(AggregateStatus::Cancelled, n);
    let ids = vec!["A".to_string()];

    let all = RunReport::from_summaries("e1", 3, ids.clone(), vec![completed(1), completed(2), completed(3)]);
    assert_eq!(all.status, AggregateStatus::Completed);

    let short = RunReport::from_summaries("e1", 3, ids.clone(), vec![completed(1), completed(2)]);
    assert_eq!(short.status, AggregateStatus::Partial);

    let stopped = RunReport::from_summaries("e1", 3, ids.clone(), vec![completed(1), cancelled(2)]);
    assert_eq!(stopped.status, AggregateStatus::Cancelled);

    let mixed = RunReport::from_summaries("e1", 3, ids.clone(), vec![completed(1), failed(2), completed(3)]);
    assert_eq!(mixed.status, AggregateStatus::Partial);
    assert_eq!(mixed.error.unwrap().kind, ErrorKind::NonZeroExit);

    let broken = RunReport::from_summaries("e1", 3, ids.clone(), vec![failed(1), failed(2), failed(3)]);
    assert_eq!(broken.status, AggregateStatus::Failed);

    let none = RunReport::from_summaries("e1", 3, ids, Vec::new());
    assert_eq!(none.status, AggregateStatus::Cancelled);
}

#[test]
fn report_serializes_as_summary_report() {
    let report = RunReport::from_summaries(
        "e1",
        1,
        vec!["A".into()],
        vec![summary(AggregateStatus::Completed, 1)],
    );
    let text = serde_json::to_string(&EngineEvent::SummaryReport(report.clone())).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["type"], "summary_report");
    assert_eq!(value["summaries"][0]["repeat"], 1);

    let back: ServerMessage = serde_json::from_str(&text).unwrap();
    assert_eq!(back, ServerMessage::Event(EngineEvent::SummaryReport(report)));
}

#[test]
fn replies_use_snake_case_tags() {
    let saved = ControlReply::Saved {
        execution_id: "e1".into(),
        key: "node_states.e1.json".into(),
    };
    assert_eq!(
        serde_json::to_value(ServerMessage::Reply(saved)).unwrap(),
        json!({ "type": "saved", "executionId": "e1", "key": "node_states.e1.json" })
    );
    assert_eq!(
        serde_json::to_value(ControlReply::error("boom")).unwrap(),
        json!({ "type": "error", "message": "boom" })
    );
}

// tests/checkpoint_store.rs

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use nodeflow::checkpoint::{
    CheckpointStore, Checkpointer, FileCheckpointStore, MemoryCheckpointStore, checkpoint_key,
};
use nodeflow::dag::{ErrorKind, NodeError, NodeState, NodeStatus, StatesMap};
use nodeflow::errors::NodeflowError;
use tempfile::tempdir;

fn sample_states() -> StatesMap {
    let mut a = NodeState::pending("A");
    a.status = NodeStatus::Completed;
    a.resolved_args = vec!["A".into(), "x y".into()];
    a.attempts = 2;
    a.retry_count = 1;
    a.start_time = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    a.end_time = Some(Utc.timestamp_millis_opt(1_714_565_000_123).unwrap());
    a.output = Some("done\n".into());

    let mut b = NodeState::pending("B");
    b.status = NodeStatus::Error;
    b.retry_count = 3;
    b.error = Some(NodeError::new(ErrorKind::Timeout, "timed out after 30s"));
    b.collected_inputs = vec!["done\n".into()];

    let mut states = StatesMap::new();
    states.insert("A".into(), a);
    states.insert("B".into(), b);
    states
}

#[test]
fn key_is_derived_from_execution_id() {
    assert_eq!(checkpoint_key("abc-123"), "node_states.abc-123.json");
}

#[test]
fn memory_round_trip_preserves_states() {
    let checkpointer = Checkpointer::new(Arc::new(MemoryCheckpointStore::new()));
    let states = sample_states();

    checkpointer.save("k", &states).unwrap();
    let loaded = checkpointer.load("k").unwrap();
    assert_eq!(loaded, states);
}

#[test]
fn file_round_trip_preserves_states() {
    let dir = tempdir().unwrap();
    let store = FileCheckpointStore::new(dir.path().join("nested").join("checkpoints"));
    let checkpointer = Checkpointer::new(Arc::new(store.clone()));
    let states = sample_states();

    let key = checkpoint_key("run-1");
    checkpointer.save(&key, &states).unwrap();
    assert!(store.root().join(&key).is_file());

    let loaded = checkpointer.load(&key).unwrap();
    assert_eq!(loaded["A"].status, NodeStatus::Completed);
    assert_eq!(loaded["A"].retry_count, 1);
    assert_eq!(loaded["A"].start_time, states["A"].start_time);
    assert_eq!(loaded["A"].end_time, states["A"].end_time);
    assert_eq!(loaded, states);
}

#[test]
fn saved_json_uses_camel_case_fields() {
    let store = MemoryCheckpointStore::new();
    let checkpointer = Checkpointer::new(Arc::new(store.clone()));
    checkpointer.save("k", &sample_states()).unwrap();

    let raw = store.get("k").unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["A"]["nodeId"], "A");
    assert_eq!(json["A"]["status"], "completed");
    assert_eq!(json["A"]["retryCount"], 1);
    assert_eq!(json["B"]["error"]["kind"], "timeout");
}

#[test]
fn missing_key_loads_empty_map() {
    let dir = tempdir().unwrap();
    let file = Checkpointer::new(Arc::new(FileCheckpointStore::new(dir.path())));
    let memory = Checkpointer::new(Arc::new(MemoryCheckpointStore::new()));

    assert!(file.load("node_states.none.json").unwrap().is_empty());
    assert!(memory.load("node_states.none.json").unwrap().is_empty());
}

#[test]
fn malformed_checkpoint_is_an_error() {
    let store = MemoryCheckpointStore::new();
    store.put("bad", "{ not json").unwrap();
    let checkpointer = Checkpointer::new(Arc::new(store));

    assert!(matches!(
        checkpointer.load("bad"),
        Err(NodeflowError::Checkpoint(_))
    ));
}

#[test]
fn file_store_rejects_path_like_keys() {
    let dir = tempdir().unwrap();
    let store = FileCheckpointStore::new(dir.path());
    assert!(store.put("../escape.json", "{}").is_err());
    assert!(store.get("a/b").is_err());
}

#[test]
fn older_checkpoints_without_optional_fields_still_load() {
    let store = MemoryCheckpointStore::new();
    store
        .put("old", r#"{ "A": { "nodeId": "A", "status": "running" } }"#)
        .unwrap();
    let loaded = Checkpointer::new(Arc::new(store)).load("old").unwrap();

    assert_eq!(loaded["A"].status, NodeStatus::Running);
    assert_eq!(loaded["A"].retry_count, 0);
    assert!(loaded["A"].collected_inputs.is_empty());
}

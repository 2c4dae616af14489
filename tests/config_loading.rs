// tests/config_loading.rs

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use nodeflow::config::{ConfigFile, load_and_validate, load_or_default};
use nodeflow::engine::EngineOptions;
use nodeflow::errors::NodeflowError;
use nodeflow::types::{CheckpointStorage, ExecutorKind};
use tempfile::{NamedTempFile, tempdir};

#[test]
fn full_config_is_parsed() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[engine]
poll_interval_ms = 200
shutdown_grace_ms = 1000
event_buffer = 8

[executor]
kind = "local"
script_dir = "/opt/scripts"
connect_timeout_secs = 3

[checkpoint]
storage = "memory"
dir = "/tmp/cp"
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.engine.poll_interval(), Duration::from_millis(200));
    assert_eq!(cfg.engine.shutdown_grace(), Duration::from_secs(1));
    assert_eq!(cfg.engine.event_buffer, 8);
    assert_eq!(cfg.executor.kind, ExecutorKind::Local);
    assert_eq!(cfg.executor.script_dir, PathBuf::from("/opt/scripts"));
    assert_eq!(cfg.executor.connect_timeout_secs, 3);
    assert_eq!(cfg.checkpoint.storage, CheckpointStorage::Memory);

    let options = EngineOptions::from_config(&cfg);
    assert_eq!(options.poll_interval, Duration::from_millis(200));
    assert_eq!(options.script_dir, PathBuf::from("/opt/scripts"));
}

#[test]
fn empty_config_uses_defaults() {
    let file = NamedTempFile::new().unwrap();
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.engine.poll_interval_ms, 250);
    assert_eq!(cfg.engine.shutdown_grace_ms, 5_000);
    assert_eq!(cfg.engine.event_buffer, 64);
    assert_eq!(cfg.executor.kind, ExecutorKind::Ssh);
    assert_eq!(cfg.executor.script_dir, PathBuf::from("../node-scripts"));
    assert_eq!(cfg.checkpoint.storage, CheckpointStorage::File);
    assert_eq!(cfg.checkpoint.dir, PathBuf::from(".nodeflow/checkpoints"));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let cfg = load_or_default(dir.path().join("Nodeflow.toml")).unwrap();
    assert_eq!(cfg.engine.poll_interval_ms, ConfigFile::default().engine.poll_interval_ms);
}

#[test]
fn zero_poll_interval_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[engine]\npoll_interval_ms = 0\n").unwrap();

    match load_and_validate(file.path()) {
        Err(NodeflowError::Config(msg)) => assert!(msg.contains("poll_interval_ms")),
        other => panic!("Expected Config error, got: {other:?}"),
    }
}

#[test]
fn unknown_executor_kind_is_a_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[executor]\nkind = \"telnet\"\n").unwrap();

    assert!(matches!(
        load_and_validate(file.path()),
        Err(NodeflowError::Toml(_))
    ));
}

#[test]
fn kinds_parse_from_cli_strings() {
    assert_eq!("LOCAL".parse::<ExecutorKind>().unwrap(), ExecutorKind::Local);
    assert_eq!(" ssh ".parse::<ExecutorKind>().unwrap(), ExecutorKind::Ssh);
    assert!("ftp".parse::<ExecutorKind>().is_err());
    assert_eq!(
        "memory".parse::<CheckpointStorage>().unwrap(),
        CheckpointStorage::Memory
    );
}

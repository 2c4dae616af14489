// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{CheckpointStorage, ExecutorKind};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [engine]
/// poll_interval_ms = 250
///
/// [executor]
/// kind = "ssh"
/// script_dir = "../node-scripts"
///
/// [checkpoint]
/// storage = "file"
/// dir = ".nodeflow/checkpoints"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub executor: ExecutorSection,

    #[serde(default)]
    pub checkpoint: CheckpointSection,
}

/// Validated configuration. Only constructible through
/// `ConfigFile::try_from(RawConfigFile)` or [`ConfigFile::default`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub engine: EngineSection,
    pub executor: ExecutorSection,
    pub checkpoint: CheckpointSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        engine: EngineSection,
        executor: ExecutorSection,
        checkpoint: CheckpointSection,
    ) -> Self {
        Self {
            engine,
            executor,
            checkpoint,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.engine, raw.executor, raw.checkpoint)
    }
}

/// `[engine]` section: dispatcher timing.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Interval between readiness scans of the dispatcher loop.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long cancellation waits for in-flight node tasks before
    /// abandoning them.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Capacity of the outbound event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_shutdown_grace_ms() -> u64 {
    5_000
}

fn default_event_buffer() -> usize {
    64
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl EngineSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// `[executor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSection {
    #[serde(default)]
    pub kind: ExecutorKind,

    /// Directory that relative node `script` paths are resolved against.
    #[serde(default = "default_script_dir")]
    pub script_dir: PathBuf,

    /// Connection timeout handed to the ssh client.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_script_dir() -> PathBuf {
    PathBuf::from("../node-scripts")
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            kind: ExecutorKind::default(),
            script_dir: default_script_dir(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// `[checkpoint]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointSection {
    #[serde(default)]
    pub storage: CheckpointStorage,

    #[serde(default = "default_checkpoint_dir")]
    pub dir: PathBuf,
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from(".nodeflow/checkpoints")
}

impl Default for CheckpointSection {
    fn default() -> Self {
        Self {
            storage: CheckpointStorage::default(),
            dir: default_checkpoint_dir(),
        }
    }
}

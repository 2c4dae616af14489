// src/checkpoint/mod.rs

//! Checkpoint adapter: persists an execution's states map under a key and
//! reads it back.
//!
//! The engine only needs "save a snapshot under a key" and "load a snapshot
//! by key"; the medium is behind [`CheckpointStore`]. A checkpoint is the
//! JSON form of [`StatesMap`].

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::CheckpointSection;
use crate::dag::StatesMap;
use crate::errors::NodeflowError;
use crate::types::CheckpointStorage;

pub mod file;
pub mod memory;

pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;

/// Abstract snapshot storage.
pub trait CheckpointStore: Send + Sync + Debug {
    fn put(&self, key: &str, contents: &str) -> Result<()>;

    /// `Ok(None)` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Storage key for an execution's checkpoint.
pub fn checkpoint_key(execution_id: &str) -> String {
    format!("node_states.{execution_id}.json")
}

/// Build the store selected by the `[checkpoint]` config section.
pub fn store_from_config(section: &CheckpointSection) -> Arc<dyn CheckpointStore> {
    match section.storage {
        CheckpointStorage::File => Arc::new(FileCheckpointStore::new(section.dir.clone())),
        CheckpointStorage::Memory => Arc::new(MemoryCheckpointStore::new()),
    }
}

/// Serializes states maps into a [`CheckpointStore`].
#[derive(Debug, Clone)]
pub struct Checkpointer {
    store: Arc<dyn CheckpointStore>,
}

impl Checkpointer {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self { store }
    }

    /// Save `states` under `key`.
    pub fn save(&self, key: &str, states: &StatesMap) -> crate::errors::Result<()> {
        let json = serde_json::to_string_pretty(states)?;
        self.store
            .put(key, &json)
            .map_err(|e| NodeflowError::Checkpoint(format!("saving '{key}': {e:#}")))?;
        info!(key = %key, nodes = states.len(), "checkpoint saved");
        Ok(())
    }

    /// Load the states map stored under `key`.
    ///
    /// A missing key yields an empty map, so restoring against a fresh run
    /// is a no-op rather than an error. Unreadable or malformed contents are
    /// errors.
    pub fn load(&self, key: &str) -> crate::errors::Result<StatesMap> {
        let contents = self
            .store
            .get(key)
            .map_err(|e| NodeflowError::Checkpoint(format!("loading '{key}': {e:#}")))?;

        let Some(contents) = contents else {
            debug!(key = %key, "no checkpoint stored under key; using empty state map");
            return Ok(StatesMap::new());
        };

        let states: StatesMap = serde_json::from_str(&contents).map_err(|e| {
            warn!(key = %key, error = %e, "checkpoint contents are not a states map");
            NodeflowError::Checkpoint(format!("parsing '{key}': {e}"))
        })?;

        info!(key = %key, nodes = states.len(), "checkpoint loaded");
        Ok(states)
    }
}

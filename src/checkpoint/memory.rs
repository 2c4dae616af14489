// src/checkpoint/memory.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use super::CheckpointStore;

/// In-process store; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn put(&self, key: &str, contents: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("checkpoint map lock poisoned"))?;
        entries.insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("checkpoint map lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }
}

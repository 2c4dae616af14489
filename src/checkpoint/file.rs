// src/checkpoint/file.rs

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::CheckpointStore;

/// One file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    root: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        // Keys become file names; refuse anything that would escape the root.
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            bail!("invalid checkpoint key {key:?}");
        }
        Ok(self.root.join(key))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn put(&self, key: &str, contents: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)
            .with_context(|| format!("creating dir {:?}", self.root))?;

        // Readers only ever see a complete file.
        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).with_context(|| format!("creating file {:?}", tmp))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("writing to file {:?}", tmp))?;
        file.sync_all()
            .with_context(|| format!("syncing file {:?}", tmp))?;
        fs::rename(&tmp, &path).with_context(|| format!("renaming {:?} to {:?}", tmp, path))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading file {:?}", path)),
        }
    }
}

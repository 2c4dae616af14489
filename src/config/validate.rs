// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{NodeflowError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = NodeflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.engine, raw.executor, raw.checkpoint))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_engine(cfg)?;
    validate_executor(cfg)?;
    validate_checkpoint(cfg)?;
    Ok(())
}

fn validate_engine(cfg: &RawConfigFile) -> Result<()> {
    if cfg.engine.poll_interval_ms == 0 {
        return Err(NodeflowError::Config(
            "[engine].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.engine.event_buffer == 0 {
        return Err(NodeflowError::Config(
            "[engine].event_buffer must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_executor(cfg: &RawConfigFile) -> Result<()> {
    if cfg.executor.connect_timeout_secs == 0 {
        return Err(NodeflowError::Config(
            "[executor].connect_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_checkpoint(cfg: &RawConfigFile) -> Result<()> {
    if cfg.checkpoint.dir.as_os_str().is_empty() {
        return Err(NodeflowError::Config(
            "[checkpoint].dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

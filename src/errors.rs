// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeflowError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cycle detected in graph: {0}")]
    DagCycle(String),

    #[error("Node '{node}' has unknown dependency '{dependency}'")]
    UnknownDependency { node: String, dependency: String },

    #[error("Missing connection details: {0}")]
    MissingConnection(String),

    #[error("Execution not found: {0}")]
    UnknownExecution(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NodeflowError {
    /// Whether this error rejected a submission before any state was created.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            NodeflowError::Validation(_)
                | NodeflowError::DagCycle(_)
                | NodeflowError::UnknownDependency { .. }
                | NodeflowError::MissingConnection(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, NodeflowError>;

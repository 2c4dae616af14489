// src/dag/request.rs

//! Wire form of a graph submission, before validation.
//!
//! ```json
//! { "type": "graph_execute", "repeat": 1,
//!   "ssh": { "host": "h", "port": 22, "username": "u", "password": "p" },
//!   "nodes": [ { "id": "A", "args": ["$inputs.data"], "inputs": { "data": "x" },
//!                "parallel": false, "times": 1, "dependencies": [],
//!                "maxRetries": 3, "timeoutSeconds": 30 } ] }
//! ```

use serde::{Deserialize, Serialize};

use crate::exec::ConnectionDetails;

/// A `graph_execute` message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRequest {
    /// Whole-graph repetitions.
    #[serde(default = "default_repeat")]
    pub repeat: u32,

    #[serde(default)]
    pub ssh: Option<ConnectionDetails>,

    #[serde(default)]
    pub nodes: Vec<RawNode>,
}

fn default_repeat() -> u32 {
    1
}

/// `args` is either one string or a list of tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawArgs {
    One(String),
    Many(Vec<serde_json::Value>),
}

/// One entry of `nodes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: String,

    #[serde(default, alias = "command")]
    pub args: Option<RawArgs>,

    #[serde(default)]
    pub inputs: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub script: Option<String>,

    #[serde(default)]
    pub parallel: bool,

    /// Per-node repeat count.
    #[serde(default = "default_times", alias = "repeatCount")]
    pub times: u32,

    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_times() -> u32 {
    1
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_seconds() -> u64 {
    30
}

impl RawNode {
    /// A node with every optional field at its default.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            args: None,
            inputs: serde_json::Map::new(),
            script: None,
            parallel: false,
            times: default_times(),
            dependencies: Vec::new(),
            max_retries: default_max_retries(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

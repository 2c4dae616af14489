// src/dag/node.rs

//! Immutable node model and the typed values that appear in node arguments
//! and inputs.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Canonical node identifier type used throughout the engine.
pub type NodeId = String;

/// Placeholder kinds recognised inside `args` and `inputs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// `$inputs.data`: the node's own `inputs["data"]`.
    InputData,
    /// `$parent.output`: captured output of the first listed dependency.
    ParentOutput,
    /// `$parents.outputs`: every output appended by completed parents.
    ParentOutputs,
}

impl ReferenceKind {
    pub const INPUT_DATA: &'static str = "$inputs.data";
    pub const PARENT_OUTPUT: &'static str = "$parent.output";
    pub const PARENT_OUTPUTS: &'static str = "$parents.outputs";

    /// Recognise an exact placeholder token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            Self::INPUT_DATA => Some(ReferenceKind::InputData),
            Self::PARENT_OUTPUT => Some(ReferenceKind::ParentOutput),
            Self::PARENT_OUTPUTS => Some(ReferenceKind::ParentOutputs),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            ReferenceKind::InputData => Self::INPUT_DATA,
            ReferenceKind::ParentOutput => Self::PARENT_OUTPUT,
            ReferenceKind::ParentOutputs => Self::PARENT_OUTPUTS,
        }
    }
}

/// A node argument or input value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    List(Vec<String>),
    Reference(ReferenceKind),
}

impl Value {
    /// Classify a single string token: a placeholder or plain text.
    pub fn from_token(token: &str) -> Self {
        match ReferenceKind::parse(token) {
            Some(kind) => Value::Reference(kind),
            None => Value::Text(token.to_string()),
        }
    }

    /// Convert an arbitrary JSON value as found in `inputs`.
    ///
    /// Strings may be placeholders, arrays become lists (non-string items are
    /// rendered as JSON text), `null` is empty text, and anything else is
    /// kept as its JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Value::from_token(s),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(json_to_text).collect())
            }
            serde_json::Value::Null => Value::Text(String::new()),
            other => Value::Text(other.to_string()),
        }
    }
}

pub(crate) fn json_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// One validated step of a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Argument tokens; each is plain text or a placeholder.
    pub args: Vec<Value>,
    /// Optional script identifier; when present the command line runs this
    /// script with the resolved arguments.
    pub script: Option<String>,
    pub inputs: BTreeMap<String, Value>,
    /// Direct dependencies, in the order they were declared.
    pub dependencies: Vec<NodeId>,
    pub parallel: bool,
    /// How many times the command runs per attempt (>= 1).
    pub repeat_count: u32,
    pub max_retries: u32,
    /// Deadline for each individual invocation.
    pub timeout: Duration,
}

impl Node {
    /// First declared dependency, the source of `$parent.output`.
    pub fn first_dependency(&self) -> Option<&str> {
        self.dependencies.first().map(|s| s.as_str())
    }
}

// src/session/protocol.rs

//! JSON message shapes exchanged with a session's caller.

use serde::{Deserialize, Serialize};

use crate::dag::GraphRequest;
use crate::engine::{EngineEvent, ExecutionId};

/// Inbound message. Control messages may name an `executionId`; without one
/// they target the session's current execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    GraphExecute(GraphRequest),
    Pause {
        #[serde(default)]
        execution_id: Option<ExecutionId>,
    },
    Resume {
        #[serde(default)]
        execution_id: Option<ExecutionId>,
    },
    Cancel {
        #[serde(default)]
        execution_id: Option<ExecutionId>,
    },
    SaveState {
        #[serde(default)]
        execution_id: Option<ExecutionId>,
    },
    /// Restore the checkpoint saved for `execution_id` into the current
    /// execution.
    LoadState { execution_id: ExecutionId },
}

/// Direct reply to a client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ControlReply {
    Started { execution_id: ExecutionId },
    Paused { execution_id: ExecutionId },
    Resumed { execution_id: ExecutionId },
    Cancelled { execution_id: ExecutionId },
    Saved { execution_id: ExecutionId, key: String },
    /// `restored` counts the node states merged into the execution.
    Loaded { execution_id: ExecutionId, restored: usize },
    Error { message: String },
}

impl ControlReply {
    pub fn error(message: impl Into<String>) -> Self {
        ControlReply::Error {
            message: message.into(),
        }
    }
}

/// Anything the server writes to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Event(EngineEvent),
    Reply(ControlReply),
}

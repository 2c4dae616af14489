// src/dag/resolver.rs

//! Placeholder resolution for node arguments.
//!
//! Resolution runs once per attempt, when the node is marked Running. It only
//! reads dependency entries that are already Completed, and those never
//! change again within a run.
//!
//! Anything that cannot be resolved (no `inputs["data"]`, no dependency, a
//! dependency without output) becomes an empty string rather than an error:
//! a fan-out graph legitimately starts with no data.

use tracing::debug;

use crate::dag::node::{Node, ReferenceKind, Value};
use crate::dag::state::NodeStatus;
use crate::dag::store::StateStore;

/// Resolves a node's argument tokens against its own inputs and its
/// completed dependencies.
pub struct ReferenceResolver<'a> {
    store: &'a StateStore,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(store: &'a StateStore) -> Self {
        Self { store }
    }

    /// Final argument list for `node`.
    pub fn resolve_args(&self, node: &Node) -> Vec<String> {
        let mut resolved = Vec::with_capacity(node.args.len());
        for arg in &node.args {
            match arg {
                Value::Text(text) => resolved.push(text.clone()),
                Value::List(items) => resolved.extend(items.iter().cloned()),
                Value::Reference(kind) => resolved.extend(self.resolve_reference(node, *kind, 0)),
            }
        }

        debug!(node = %node.id, args = ?resolved, "resolved node arguments");
        resolved
    }

    /// Resolve one input value by name, flattened to text.
    ///
    /// Lists are joined with spaces; absent inputs are empty.
    pub fn resolve_input(&self, node: &Node, name: &str) -> String {
        match node.inputs.get(name) {
            Some(value) => self.resolve_value(node, value, 0).join(" "),
            None => String::new(),
        }
    }

    fn resolve_value(&self, node: &Node, value: &Value, depth: u8) -> Vec<String> {
        match value {
            Value::Text(text) => vec![text.clone()],
            Value::List(items) => items.clone(),
            Value::Reference(kind) => self.resolve_reference(node, *kind, depth),
        }
    }

    fn resolve_reference(&self, node: &Node, kind: ReferenceKind, depth: u8) -> Vec<String> {
        match kind {
            ReferenceKind::InputData => {
                // `inputs.data` may itself be a parent reference, but not a
                // reference back to itself.
                match node.inputs.get("data") {
                    Some(Value::Reference(ReferenceKind::InputData)) | None => vec![String::new()],
                    Some(value) if depth == 0 => self.resolve_value(node, value, depth + 1),
                    Some(_) => vec![String::new()],
                }
            }
            ReferenceKind::ParentOutput => vec![self.parent_output(node)],
            ReferenceKind::ParentOutputs => {
                let collected = self
                    .store
                    .with_entry(&node.id, |s| s.collected_inputs.clone())
                    .unwrap_or_default();
                if collected.is_empty() {
                    vec![String::new()]
                } else {
                    collected
                        .iter()
                        .map(|o| trim_line_endings(o).to_string())
                        .collect()
                }
            }
        }
    }

    /// Output of the first declared dependency, if it completed.
    fn parent_output(&self, node: &Node) -> String {
        let Some(parent) = node.first_dependency() else {
            return String::new();
        };

        self.store
            .with_entry(parent, |s| {
                if s.status == NodeStatus::Completed {
                    s.output.as_deref().map(trim_line_endings).map(str::to_string)
                } else {
                    None
                }
            })
            .flatten()
            .unwrap_or_default()
    }
}

/// Captured command output usually ends with a newline; strip trailing line
/// endings before substituting it into another command.
fn trim_line_endings(s: &str) -> &str {
    s.trim_end_matches(['\n', '\r'])
}

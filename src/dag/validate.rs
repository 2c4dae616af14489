// src/dag/validate.rs

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::graph::Graph;
use crate::dag::node::{Node, NodeId, Value};
use crate::dag::request::{GraphRequest, RawArgs, RawNode};
use crate::errors::{NodeflowError, Result};
use crate::exec::ConnectionDetails;

impl TryFrom<GraphRequest> for Graph {
    type Error = NodeflowError;

    /// Validate a submission that must carry connection details.
    fn try_from(request: GraphRequest) -> std::result::Result<Self, Self::Error> {
        validate_request(request, true)
    }
}

/// Validate a submission and build the immutable [`Graph`].
///
/// `require_connection` is false only for executors that run commands
/// locally.
pub fn validate_request(request: GraphRequest, require_connection: bool) -> Result<Graph> {
    ensure_has_nodes(&request)?;
    validate_repeat(&request)?;
    let connection = validate_connection(request.ssh, require_connection)?;
    validate_node_fields(&request.nodes)?;
    validate_dependencies(&request.nodes)?;
    let topo_order = validate_dag(&request.nodes)?;

    let nodes = request.nodes.into_iter().map(node_from_raw).collect();
    Ok(Graph::new_unchecked(
        nodes,
        topo_order,
        request.repeat,
        connection,
    ))
}

fn ensure_has_nodes(request: &GraphRequest) -> Result<()> {
    if request.nodes.is_empty() {
        return Err(NodeflowError::Validation(
            "graph must contain at least one node".to_string(),
        ));
    }
    Ok(())
}

fn validate_repeat(request: &GraphRequest) -> Result<()> {
    if request.repeat == 0 {
        return Err(NodeflowError::Validation(
            "repeat must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_connection(
    ssh: Option<ConnectionDetails>,
    require_connection: bool,
) -> Result<Option<ConnectionDetails>> {
    match ssh {
        Some(details) => {
            if require_connection {
                let missing = details.missing_fields();
                if !missing.is_empty() {
                    return Err(NodeflowError::MissingConnection(format!(
                        "ssh details missing: {}",
                        missing.join(", ")
                    )));
                }
            }
            Ok(Some(details))
        }
        None if require_connection => Err(NodeflowError::MissingConnection(
            "graph submission has no `ssh` block".to_string(),
        )),
        None => Ok(None),
    }
}

fn validate_node_fields(nodes: &[RawNode]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for node in nodes {
        if node.id.trim().is_empty() {
            return Err(NodeflowError::Validation(
                "node id must not be empty".to_string(),
            ));
        }
        if !seen.insert(node.id.as_str()) {
            return Err(NodeflowError::Validation(format!(
                "duplicate node id '{}'",
                node.id
            )));
        }
        if node.times == 0 {
            return Err(NodeflowError::Validation(format!(
                "node '{}': times must be >= 1 (got 0)",
                node.id
            )));
        }
        if node.timeout_seconds == 0 {
            return Err(NodeflowError::Validation(format!(
                "node '{}': timeoutSeconds must be >= 1 (got 0)",
                node.id
            )));
        }
    }
    Ok(())
}

fn validate_dependencies(nodes: &[RawNode]) -> Result<()> {
    let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    for node in nodes {
        for dep in node.dependencies.iter() {
            if dep == &node.id {
                return Err(NodeflowError::DagCycle(format!(
                    "cycle detected: node '{}' depends on itself",
                    node.id
                )));
            }
            if !ids.contains(dep.as_str()) {
                return Err(NodeflowError::UnknownDependency {
                    node: node.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Returns a topological order (dependencies first).
fn validate_dag(nodes: &[RawNode]) -> Result<Vec<NodeId>> {
    // Edge direction: dep -> node.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for node in nodes {
        graph.add_node(node.id.as_str());
    }

    for node in nodes {
        for dep in node.dependencies.iter() {
            graph.add_edge(dep.as_str(), node.id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(|s| s.to_string()).collect()),
        Err(cycle) => Err(NodeflowError::DagCycle(format!(
            "cycle detected in graph involving node '{}'",
            cycle.node_id()
        ))),
    }
}

fn node_from_raw(raw: RawNode) -> Node {
    let args = match raw.args {
        None => Vec::new(),
        Some(RawArgs::One(token)) => vec![Value::from_token(&token)],
        Some(RawArgs::Many(tokens)) => tokens
            .iter()
            .map(|t| match t {
                serde_json::Value::String(s) => Value::from_token(s),
                other => Value::Text(crate::dag::node::json_to_text(other)),
            })
            .collect(),
    };

    let inputs: BTreeMap<String, Value> = raw
        .inputs
        .iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v)))
        .collect();

    // Duplicate dependency entries collapse; declaration order is kept so
    // the first dependency stays the `$parent.output` source.
    let mut seen = HashSet::new();
    let dependencies = raw
        .dependencies
        .into_iter()
        .filter(|d| seen.insert(d.clone()))
        .collect();

    Node {
        id: raw.id,
        args,
        script: raw.script.filter(|s| !s.trim().is_empty()),
        inputs,
        dependencies,
        parallel: raw.parallel,
        repeat_count: raw.times,
        max_retries: raw.max_retries,
        timeout: Duration::from_secs(raw.timeout_seconds),
    }
}

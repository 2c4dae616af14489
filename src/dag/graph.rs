// src/dag/graph.rs

use std::collections::HashMap;

use crate::dag::node::{Node, NodeId};
use crate::exec::ConnectionDetails;

/// Internal adjacency record: immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: nodes that must complete before this one can run.
    deps: Vec<NodeId>,
    /// Direct dependents: nodes that depend on this one.
    dependents: Vec<NodeId>,
}

/// Lightweight DAG adjacency keyed by node id.
///
/// Acyclicity is checked in `dag::validate`; here we keep adjacency plus a
/// topological order for scheduling and blocked propagation.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<NodeId, DagNode>,
    topo_order: Vec<NodeId>,
}

impl DagGraph {
    /// Build adjacency from validated nodes and a precomputed topological
    /// order.
    pub fn new(nodes: &[Node], topo_order: Vec<NodeId>) -> Self {
        let mut adjacency: HashMap<NodeId, DagNode> = nodes
            .iter()
            .map(|n| {
                (
                    n.id.clone(),
                    DagNode {
                        deps: n.dependencies.clone(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        // Dependents keep submission order.
        for node in nodes {
            for dep in &node.dependencies {
                if let Some(dep_node) = adjacency.get_mut(dep) {
                    dep_node.dependents.push(node.id.clone());
                }
            }
        }

        Self {
            nodes: adjacency,
            topo_order,
        }
    }

    /// Immediate dependencies of a node.
    pub fn dependencies_of(&self, id: &str) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a node.
    pub fn dependents_of(&self, id: &str) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Nodes with no dependents.
    pub fn is_sink(&self, id: &str) -> bool {
        self.dependents_of(id).is_empty()
    }

    /// Every node id, dependencies before dependents.
    pub fn topological_order(&self) -> &[NodeId] {
        &self.topo_order
    }
}

/// A validated graph submission: nodes in submission order plus adjacency,
/// repeat count and connection details.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    dag: DagGraph,
    repeat: u32,
    connection: Option<ConnectionDetails>,
}

impl Graph {
    /// Assumes the caller already validated ids, dependencies and acyclicity.
    pub(crate) fn new_unchecked(
        nodes: Vec<Node>,
        topo_order: Vec<NodeId>,
        repeat: u32,
        connection: Option<ConnectionDetails>,
    ) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let dag = DagGraph::new(&nodes, topo_order);
        Self {
            nodes,
            index,
            dag,
            repeat,
            connection,
        }
    }

    /// Nodes in submission order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub fn dag(&self) -> &DagGraph {
        &self.dag
    }

    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    pub fn connection(&self) -> Option<&ConnectionDetails> {
        self.connection.as_ref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

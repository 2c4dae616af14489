use nodeflow::dag::{Graph, GraphRequest, RawArgs, RawNode, validate_request};
use nodeflow::exec::ConnectionDetails;
use serde_json::Value;

/// Builder for `GraphRequest` to simplify test setup.
pub struct GraphBuilder {
    request: GraphRequest,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            request: GraphRequest {
                repeat: 1,
                ssh: None,
                nodes: Vec::new(),
            },
        }
    }

    pub fn node(mut self, node: NodeBuilder) -> Self {
        self.request.nodes.push(node.build());
        self
    }

    pub fn repeat(mut self, repeat: u32) -> Self {
        self.request.repeat = repeat;
        self
    }

    pub fn ssh(mut self, host: &str, username: &str, password: &str) -> Self {
        self.request.ssh = Some(ConnectionDetails::new(host, username, password));
        self
    }

    pub fn build(self) -> GraphRequest {
        self.request
    }

    /// Validated graph; connection details are not required.
    pub fn build_graph(self) -> Graph {
        validate_request(self.request, false).expect("Failed to build valid graph from builder")
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RawNode`.
///
/// The command defaults to the node id, which is what [`ScriptedExecutor`]
/// keys its behaviour on.
///
/// [`ScriptedExecutor`]: crate::ScriptedExecutor
pub struct NodeBuilder {
    node: RawNode,
    args: Vec<Value>,
}

impl NodeBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            node: RawNode::new(id),
            args: vec![Value::String(id.to_string())],
        }
    }

    /// Replace the whole command with one string.
    pub fn cmd(mut self, cmd: &str) -> Self {
        self.args = vec![Value::String(cmd.to_string())];
        self
    }

    /// Append one argument token.
    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(Value::String(arg.to_string()));
        self
    }

    pub fn input(mut self, name: &str, value: Value) -> Self {
        self.node.inputs.insert(name.to_string(), value);
        self
    }

    pub fn script(mut self, script: &str) -> Self {
        self.node.script = Some(script.to_string());
        self
    }

    pub fn parallel(mut self, val: bool) -> Self {
        self.node.parallel = val;
        self
    }

    pub fn times(mut self, times: u32) -> Self {
        self.node.times = times;
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.node.dependencies.push(dep.to_string());
        self
    }

    pub fn max_retries(mut self, val: u32) -> Self {
        self.node.max_retries = val;
        self
    }

    pub fn timeout_secs(mut self, val: u64) -> Self {
        self.node.timeout_seconds = val;
        self
    }

    pub fn build(mut self) -> RawNode {
        self.node.args = Some(RawArgs::Many(self.args));
        self.node
    }
}

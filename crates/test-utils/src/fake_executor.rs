use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use nodeflow::exec::{ConnectionDetails, ExecError, ExecFuture, Invocation, RemoteExecutor};

/// A latch tests open to release every invocation waiting on it.
#[derive(Clone)]
pub struct Gate {
    tx: Arc<watch::Sender<bool>>,
}

impl Gate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// Scripted behaviour for one node key.
#[derive(Clone, Default)]
pub struct NodeScript {
    /// Fail this many calls before succeeding.
    pub fail_times: u32,
    /// Fail every call.
    pub fail_always: bool,
    /// Error returned by failing calls; defaults to a non-zero exit.
    pub error: Option<ExecError>,
    /// Sleep this long before answering (honours deadline and cancel).
    pub delay: Duration,
    /// Wait for this gate before answering (honours deadline and cancel).
    pub gate: Option<Gate>,
    /// Output on success; defaults to the full command line.
    pub output: Option<String>,
    /// Panic instead of answering.
    pub panic: bool,
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub key: String,
    pub command_line: String,
    pub started: Instant,
    pub finished: Instant,
    pub result: Result<String, ExecError>,
}

/// A fake remote executor that:
/// - keys behaviour on the first token of the command line (the node id
///   when nodes are built with [`crate::NodeBuilder`])
/// - records every call with timestamps and result
/// - tracks how many calls were in flight at once.
pub struct ScriptedExecutor {
    scripts: Mutex<HashMap<String, NodeScript>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requires_connection: bool,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requires_connection: false,
        }
    }

    pub fn requiring_connection(mut self) -> Self {
        self.requires_connection = true;
        self
    }

    pub fn script(self, key: &str, script: NodeScript) -> Self {
        self.scripts.lock().unwrap().insert(key.to_string(), script);
        self
    }

    pub fn fail_always(self, key: &str) -> Self {
        self.script(
            key,
            NodeScript {
                fail_always: true,
                ..NodeScript::default()
            },
        )
    }

    pub fn fail_times(self, key: &str, times: u32) -> Self {
        self.script(
            key,
            NodeScript {
                fail_times: times,
                ..NodeScript::default()
            },
        )
    }

    pub fn delay(self, key: &str, delay: Duration) -> Self {
        self.script(
            key,
            NodeScript {
                delay,
                ..NodeScript::default()
            },
        )
    }

    pub fn gated(self, key: &str, gate: &Gate) -> Self {
        self.script(
            key,
            NodeScript {
                gate: Some(gate.clone()),
                ..NodeScript::default()
            },
        )
    }

    pub fn output(self, key: &str, output: &str) -> Self {
        self.script(
            key,
            NodeScript {
                output: Some(output.to_string()),
                ..NodeScript::default()
            },
        )
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, key: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.key == key).collect()
    }

    /// Keys in the order their calls started.
    pub fn start_order(&self) -> Vec<String> {
        let mut calls = self.calls();
        calls.sort_by_key(|c| c.started);
        calls.into_iter().map(|c| c.key).collect()
    }

    /// Number of calls currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Poll until `key` has finished at least `n` calls.
    pub async fn wait_for_calls(&self, key: &str, n: usize) {
        while self.calls_for(key).len() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Poll until at least `n` calls are in flight.
    pub async fn wait_for_in_flight(&self, n: usize) {
        while self.in_flight() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn script_for(&self, key: &str) -> NodeScript {
        self.scripts
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    async fn answer(
        &self,
        key: &str,
        command_line: &str,
        script: &NodeScript,
        invocation: &Invocation,
    ) -> Result<String, ExecError> {
        let wait = async {
            if !script.delay.is_zero() {
                tokio::time::sleep(script.delay).await;
            }
            if let Some(gate) = &script.gate {
                gate.wait().await;
            }
        };

        tokio::select! {
            _ = wait => {}
            _ = tokio::time::sleep_until(invocation.deadline) => {
                return Err(ExecError::Timeout(invocation.timeout));
            }
            _ = invocation.cancel.cancelled() => return Err(ExecError::Cancelled),
        }

        if script.panic {
            panic!("scripted panic for {key}");
        }

        let should_fail = script.fail_always || {
            let mut failures = self.failures.lock().unwrap();
            let count = failures.entry(key.to_string()).or_insert(0);
            if *count < script.fail_times {
                *count += 1;
                true
            } else {
                false
            }
        };

        if should_fail {
            Err(script.error.clone().unwrap_or(ExecError::NonZeroExit {
                code: 1,
                output: format!("{key} failed"),
            }))
        } else {
            Ok(script
                .output
                .clone()
                .unwrap_or_else(|| command_line.to_string()))
        }
    }
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteExecutor for ScriptedExecutor {
    fn execute<'a>(
        &'a self,
        _connection: Option<&'a ConnectionDetails>,
        command_line: &'a str,
        invocation: Invocation,
    ) -> ExecFuture<'a> {
        Box::pin(async move {
            let key = command_line
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .trim_matches('\'')
                .to_string();
            let script = self.script_for(&key);

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let started = Instant::now();

            let result = self.answer(&key, command_line, &script, &invocation).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push(Call {
                key,
                command_line: command_line.to_string(),
                started,
                finished: Instant::now(),
                result: result.clone(),
            });
            result
        })
    }

    fn requires_connection(&self) -> bool {
        self.requires_connection
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

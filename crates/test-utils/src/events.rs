use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use nodeflow::dag::{NodeState, NodeStatus};
use nodeflow::engine::{EngineEvent, RunReport, RunSummary};

/// Collects every event sent on a channel in a background task, so the
/// engine never blocks on a full channel during a test.
#[derive(Clone)]
pub struct EventLog {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl EventLog {
    /// A sender to hand to the controller plus the log draining it.
    pub fn channel() -> (mpsc::Sender<EngineEvent>, EventLog) {
        let (tx, mut rx) = mpsc::channel(64);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                sink.lock().unwrap().push(event);
            }
        });
        (tx, EventLog { events })
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Every `progress` snapshot, oldest first.
    pub fn progress_snapshots(&self) -> Vec<Vec<NodeState>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::Progress { nodes, .. } => Some(nodes),
                _ => None,
            })
            .collect()
    }

    pub fn node_finished(&self) -> Vec<NodeState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::NodeFinished { node, .. } => Some(node),
                _ => None,
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<RunSummary> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::Summary(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn report(&self) -> Option<RunReport> {
        self.events().into_iter().find_map(|e| match e {
            EngineEvent::SummaryReport(r) => Some(r),
            _ => None,
        })
    }

    /// Poll until the final report has been collected.
    pub async fn wait_for_report(&self) -> RunReport {
        loop {
            if let Some(report) = self.report() {
                return report;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Whether any progress snapshot showed `node` with `status`.
    pub fn saw_status(&self, node: &str, status: NodeStatus) -> bool {
        self.progress_snapshots()
            .iter()
            .flatten()
            .any(|s| s.node_id == node && s.status == status)
    }
}

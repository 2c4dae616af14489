// src/session/handler.rs

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::protocol::{ClientMessage, ControlReply, ServerMessage};
use super::{MessageSink, MessageSource};
use crate::dag::NodeError;
use crate::engine::{EngineEvent, ExecutionId, RunController};
use crate::errors::{NodeflowError, Result};

/// Routes one session's messages to the run controller and forwards the
/// events of the executions it started.
///
/// When the caller hangs up, the handler keeps forwarding until the current
/// execution's `summary_report`, then forgets every execution it started.
pub struct SessionHandler {
    controller: Arc<RunController>,
    events_tx: mpsc::Sender<EngineEvent>,
    events_rx: mpsc::Receiver<EngineEvent>,
    current: Option<ExecutionId>,
    /// Execution whose final report has not been forwarded yet.
    awaiting_report: Option<ExecutionId>,
    started: Vec<ExecutionId>,
}

impl SessionHandler {
    pub fn new(controller: Arc<RunController>, event_buffer: usize) -> Self {
        let (events_tx, events_rx) = mpsc::channel(event_buffer.max(1));
        Self {
            controller,
            events_tx,
            events_rx,
            current: None,
            awaiting_report: None,
            started: Vec::new(),
        }
    }

    /// Serve until the caller hangs up and the current execution finished.
    pub async fn serve<S, K>(mut self, mut source: S, mut sink: K) -> Result<()>
    where
        S: MessageSource,
        K: MessageSink,
    {
        info!("session started");
        let mut source_open = true;

        let result = loop {
            tokio::select! {
                msg = source.recv(), if source_open => match msg {
                    Ok(Some(text)) => {
                        let reply = self.handle_text(&text);
                        if let Err(e) = send(&mut sink, &ServerMessage::Reply(reply)).await {
                            break Err(e);
                        }
                    }
                    Ok(None) => {
                        info!("session input closed");
                        source_open = false;
                        if self.awaiting_report.is_none() {
                            break Ok(());
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "session input failed; no further messages");
                        source_open = false;
                        if self.awaiting_report.is_none() {
                            break Ok(());
                        }
                    }
                },
                Some(event) = self.events_rx.recv() => {
                    let finished = match &event {
                        EngineEvent::SummaryReport(report) => {
                            self.awaiting_report.as_deref() == Some(report.execution_id.as_str())
                        }
                        _ => false,
                    };
                    let event = caller_facing_event(event);
                    if let Err(e) = send(&mut sink, &ServerMessage::Event(event)).await {
                        break Err(e);
                    }
                    if finished {
                        self.awaiting_report = None;
                        if !source_open {
                            break Ok(());
                        }
                    }
                }
            }
        };

        for id in &self.started {
            self.controller.forget(id);
        }
        info!(executions = self.started.len(), "session ended");
        result
    }

    /// Handle one inbound text message and produce its reply.
    pub fn handle_text(&mut self, text: &str) -> ControlReply {
        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "unparseable session message");
                return ControlReply::error(format!("invalid message: {e}"));
            }
        };

        match self.handle(message) {
            Ok(reply) => reply,
            Err(e) => ControlReply::error(caller_facing_message(&e.to_string())),
        }
    }

    fn handle(&mut self, message: ClientMessage) -> Result<ControlReply> {
        match message {
            ClientMessage::GraphExecute(request) => {
                if let Some(previous) = self.current.take() {
                    info!(execution_id = %previous, "new graph submitted; cancelling previous execution");
                    if let Err(e) = self.controller.cancel(&previous) {
                        debug!(execution_id = %previous, error = %e, "previous execution already gone");
                    }
                }

                let handle = self.controller.submit(request, self.events_tx.clone())?;
                let execution_id = handle.id.clone();
                self.current = Some(execution_id.clone());
                self.awaiting_report = Some(execution_id.clone());
                self.started.push(execution_id.clone());
                Ok(ControlReply::Started { execution_id })
            }
            ClientMessage::Pause { execution_id } => {
                let execution_id = self.target(execution_id)?;
                self.controller.pause(&execution_id)?;
                Ok(ControlReply::Paused { execution_id })
            }
            ClientMessage::Resume { execution_id } => {
                let execution_id = self.target(execution_id)?;
                self.controller.resume(&execution_id)?;
                Ok(ControlReply::Resumed { execution_id })
            }
            ClientMessage::Cancel { execution_id } => {
                let execution_id = self.target(execution_id)?;
                self.controller.cancel(&execution_id)?;
                Ok(ControlReply::Cancelled { execution_id })
            }
            ClientMessage::SaveState { execution_id } => {
                let execution_id = self.target(execution_id)?;
                let key = self.controller.save_checkpoint(&execution_id)?;
                Ok(ControlReply::Saved { execution_id, key })
            }
            ClientMessage::LoadState { execution_id } => {
                let target = self.target(None)?;
                let report = self.controller.restore(&target, &execution_id)?;
                Ok(ControlReply::Loaded {
                    execution_id,
                    restored: report.restored.len(),
                })
            }
        }
    }

    /// Explicit id, or the session's current execution.
    fn target(&self, explicit: Option<ExecutionId>) -> Result<ExecutionId> {
        explicit
            .or_else(|| self.current.clone())
            .ok_or_else(|| NodeflowError::UnknownExecution("no active execution".to_string()))
    }
}

async fn send<K: MessageSink>(sink: &mut K, message: &ServerMessage) -> Result<()> {
    let text = serde_json::to_string(message)?;
    sink.send(text).await
}

/// Error text as shown to the caller: refused TCP connections are reported
/// as an SSH connection failure.
pub fn caller_facing_message(text: &str) -> String {
    if text.to_ascii_lowercase().contains("connection refused") {
        "SSH connection failed".to_string()
    } else {
        text.to_string()
    }
}

/// Rewrites every node error carried by an event with [`caller_facing_message`].
pub fn caller_facing_event(mut event: EngineEvent) -> EngineEvent {
    fn rewrite(error: &mut Option<NodeError>) {
        if let Some(err) = error {
            err.message = caller_facing_message(&err.message);
        }
    }

    match &mut event {
        EngineEvent::Progress { nodes, .. } => {
            for node in nodes.iter_mut() {
                rewrite(&mut node.error);
            }
        }
        EngineEvent::NodeFinished { node, .. } => rewrite(&mut node.error),
        EngineEvent::Summary(summary) => rewrite(&mut summary.error),
        EngineEvent::SummaryReport(report) => {
            rewrite(&mut report.error);
            for summary in report.summaries.iter_mut() {
                rewrite(&mut summary.error);
            }
        }
    }
    event
}

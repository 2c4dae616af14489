// src/lib.rs

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod session;
pub mod types;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_and_validate, load_or_default};
use crate::dag::{Graph, GraphRequest, StatesMap, validate_request};
use crate::engine::{AggregateStatus, EngineEvent, EngineOptions, RunController};
use crate::exec::{LocalShellExecutor, RemoteExecutor, SshExecutor};
use crate::session::{ClientMessage, SessionHandler};
use crate::types::ExecutorKind;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the remote executor and checkpoint store
/// - the run controller
/// - either a single `--graph` run or a stdio session
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = match &args.config {
        Some(path) => load_and_validate(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => load_or_default(default_config_path())?,
    };

    let kind = args.executor.unwrap_or(cfg.executor.kind);
    let executor = executor_for(kind, &cfg);
    info!(executor = executor.name(), "nodeflow starting");

    if let Some(graph_path) = &args.graph {
        let request = read_graph_request(graph_path)?;

        if args.dry_run {
            let graph = validate_request(request, executor.requires_connection())?;
            print_dry_run(&graph);
            return Ok(());
        }

        let controller = Arc::new(build_controller(executor, &cfg));
        return run_graph(controller, request, args.restore.as_deref(), cfg.engine.event_buffer)
            .await;
    }

    let controller = Arc::new(build_controller(executor, &cfg));
    serve_stdio(controller, cfg.engine.event_buffer).await
}

fn executor_for(kind: ExecutorKind, cfg: &ConfigFile) -> Arc<dyn RemoteExecutor> {
    match kind {
        ExecutorKind::Ssh => Arc::new(SshExecutor::new(Duration::from_secs(
            cfg.executor.connect_timeout_secs,
        ))),
        ExecutorKind::Local => Arc::new(LocalShellExecutor::new()),
    }
}

fn build_controller(executor: Arc<dyn RemoteExecutor>, cfg: &ConfigFile) -> RunController {
    RunController::new(
        executor,
        checkpoint::store_from_config(&cfg.checkpoint),
        EngineOptions::from_config(cfg),
    )
}

/// Accept either a full `graph_execute` message or a bare graph body.
fn read_graph_request(path: &Path) -> Result<GraphRequest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading graph file {}", path.display()))?;

    match serde_json::from_str::<ClientMessage>(&contents) {
        Ok(ClientMessage::GraphExecute(request)) => Ok(request),
        Ok(other) => bail!("graph file holds a {other:?} message, not graph_execute"),
        Err(_) => serde_json::from_str::<GraphRequest>(&contents)
            .with_context(|| format!("parsing graph file {}", path.display())),
    }
}

/// Run one graph to completion, printing events as JSON lines.
///
/// Fails unless the final report is `completed`.
async fn run_graph(
    controller: Arc<RunController>,
    request: GraphRequest,
    restore_from: Option<&str>,
    event_buffer: usize,
) -> Result<()> {
    let restored = match restore_from {
        Some(id) => {
            let states = controller.load_checkpoint(id)?;
            info!(from = %id, nodes = states.len(), "seeding run from checkpoint");
            states
        }
        None => StatesMap::new(),
    };

    let (tx, mut rx) = mpsc::channel::<EngineEvent>(event_buffer.max(1));
    let handle = controller.submit_with_states(request, tx, restored)?;
    let execution_id = handle.id.clone();

    // Ctrl-C -> cancel the run; the summary still gets printed.
    {
        let controller = Arc::clone(&controller);
        let execution_id = execution_id.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; cancelling execution");
            if let Err(e) = controller.cancel(&execution_id) {
                debug!(error = %e, "execution already gone");
            }
        });
    }

    let mut stdout = tokio::io::stdout();
    while let Some(event) = rx.recv().await {
        let is_report = matches!(event, EngineEvent::SummaryReport(_));
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
        if is_report {
            break;
        }
    }

    let report = handle.wait().await?;
    controller.forget(&execution_id);

    if report.status != AggregateStatus::Completed {
        bail!(
            "execution {} finished with status {}",
            report.execution_id,
            report.status
        );
    }
    Ok(())
}

async fn serve_stdio(controller: Arc<RunController>, event_buffer: usize) -> Result<()> {
    let (source, sink) = session::stdio();
    let handler = SessionHandler::new(controller, event_buffer);
    info!("serving session on stdin/stdout");
    handler.serve(source, sink).await?;
    Ok(())
}

/// Simple dry-run output: print nodes, deps and policies.
fn print_dry_run(graph: &Graph) {
    println!("nodeflow dry-run");
    println!("  repeat = {}", graph.repeat());
    if let Some(conn) = graph.connection() {
        println!("  target = {}@{}:{}", conn.username, conn.host, conn.port);
    }
    println!();

    println!("nodes ({}), in dispatch order:", graph.len());
    for id in graph.dag().topological_order() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        println!("  - {id}");
        if let Some(script) = &node.script {
            println!("      script: {script}");
        }
        if !node.args.is_empty() {
            println!("      args: {:?}", node.args);
        }
        if !node.dependencies.is_empty() {
            println!("      dependencies: {:?}", node.dependencies);
        }
        if node.parallel {
            println!("      parallel: true");
        }
        if node.repeat_count > 1 {
            println!("      times: {}", node.repeat_count);
        }
        println!(
            "      max_retries: {}, timeout: {}s",
            node.max_retries,
            node.timeout.as_secs()
        );
    }

    debug!("dry-run complete (no execution)");
}

use super::graph::WorkflowGraph;
use super::sources::{
    DEFAULT_SUCCESS_RATE, DelaySource, Outcome, OutcomeSource, RandomOutcome, UniformDelay,
};
use crate::error::Result;
use crate::events::{EventSink, EventType, ExecutionEvent};
use crate::store::SharedStore;
use crate::types::{NodeId, NodeStatus, RunId, WorkflowNode};
use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Tuning for the default random sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
}

fn default_min_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    1500
}

fn default_success_rate() -> f64 {
    DEFAULT_SUCCESS_RATE
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            success_rate: default_success_rate(),
        }
    }
}

/// Summary of one simulated run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Nodes in the order they were marked running
    pub executed: Vec<NodeId>,
    /// Final status of every node that finished
    pub outcomes: HashMap<NodeId, NodeStatus>,
    pub cancelled: bool,
    pub no_trigger: bool,
}

impl RunReport {
    pub fn status_of(&self, node_id: &NodeId) -> Option<NodeStatus> {
        self.outcomes.get(node_id).copied()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .values()
            .filter(|s| **s == NodeStatus::Success)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .values()
            .filter(|s| **s == NodeStatus::Error)
            .count()
    }
}

/// Per-run state shared by every traversal branch
struct RunContext<'a> {
    run_id: RunId,
    store: &'a SharedStore,
    graph: &'a WorkflowGraph,
    nodes: HashMap<NodeId, WorkflowNode>,
    epoch: u64,
    visited: Mutex<HashSet<NodeId>>,
    executed: Mutex<Vec<NodeId>>,
    outcomes: Mutex<HashMap<NodeId, NodeStatus>>,
    cancel_rx: watch::Receiver<bool>,
}

impl RunContext<'_> {
    /// Claim a node for this run; false if another branch already did
    fn visit(&self, node_id: &NodeId) -> bool {
        self.visited.lock().insert(node_id.clone())
    }

    fn set_status(&self, node_id: &NodeId, status: NodeStatus) -> bool {
        self.store.lock().set_status(node_id, status, self.epoch)
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Sleep for `delay`; false if the run was stopped meanwhile
    async fn pause(&self, delay: Duration) -> bool {
        let mut cancel_rx = self.cancel_rx.clone();
        let elapsed = tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = wait_for_cancel(&mut cancel_rx) => false,
        };
        elapsed && !self.is_cancelled()
    }
}

async fn wait_for_cancel(cancel_rx: &mut watch::Receiver<bool>) {
    loop {
        let cancelled = *cancel_rx.borrow_and_update();
        if cancelled {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            // Sender replaced by a newer run; only the epoch guard applies now
            std::future::pending::<()>().await;
        }
    }
}

/// Walks the workflow from its trigger nodes, marking each reached node
/// running and then success or error
///
/// Traversal only continues past successful nodes. A node reachable along
/// several paths executes once per run.
pub struct ExecutionSimulator {
    outcomes: Arc<dyn OutcomeSource>,
    delays: Arc<dyn DelaySource>,
    events: Arc<dyn EventSink>,
    // Cancellation handle of the run in progress
    active_run: Mutex<Option<(RunId, watch::Sender<bool>)>>,
}

impl ExecutionSimulator {
    /// Simulator with random delays and outcomes
    pub fn new(config: &SimulatorConfig, events: Arc<dyn EventSink>) -> Self {
        Self::with_sources(
            Arc::new(RandomOutcome::new(config.success_rate)),
            Arc::new(UniformDelay::new(config.min_delay_ms, config.max_delay_ms)),
            events,
        )
    }

    pub fn with_sources(
        outcomes: Arc<dyn OutcomeSource>,
        delays: Arc<dyn DelaySource>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            outcomes,
            delays,
            events,
            active_run: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active_run.lock().is_some()
    }

    /// Simulate the workflow currently in `store`
    pub async fn run(&self, store: &SharedStore) -> Result<RunReport> {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let clock = Instant::now();

        let (nodes, connections, epoch) = {
            let store = store.lock();
            (
                store.nodes().to_vec(),
                store.connections().to_vec(),
                store.run_epoch(),
            )
        };
        let graph = WorkflowGraph::from_parts(&nodes, &connections);

        if graph.triggers().is_empty() {
            tracing::warn!("No trigger node found, workflow not started");
            self.events
                .emit(ExecutionEvent::new(run_id, EventType::NoTrigger))
                .await?;

            return Ok(RunReport {
                run_id,
                started_at,
                finished_at: Utc::now(),
                executed: Vec::new(),
                outcomes: HashMap::new(),
                cancelled: false,
                no_trigger: true,
            });
        }

        tracing::info!(
            "Starting workflow execution: run_id={}, triggers={}",
            run_id,
            graph.triggers().len()
        );
        self.events
            .emit(ExecutionEvent::new(
                run_id,
                EventType::RunStarted {
                    trigger_count: graph.triggers().len(),
                },
            ))
            .await?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        *self.active_run.lock() = Some((run_id, cancel_tx));

        let ctx = RunContext {
            run_id,
            store,
            graph: &graph,
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
            epoch,
            visited: Mutex::new(HashSet::new()),
            executed: Mutex::new(Vec::new()),
            outcomes: Mutex::new(HashMap::new()),
            cancel_rx,
        };

        let branches = graph
            .triggers()
            .iter()
            .map(|trigger| self.execute_node(&ctx, trigger.clone()));
        join_all(branches).await;

        {
            let mut active = self.active_run.lock();
            if matches!(active.as_ref(), Some((id, _)) if *id == run_id) {
                *active = None;
            }
        }

        let cancelled = ctx.is_cancelled() || store.lock().run_epoch() != epoch;
        let duration_ms = clock.elapsed().as_millis() as u64;

        if cancelled {
            tracing::info!("Workflow execution stopped: run_id={}", run_id);
            self.events
                .emit(ExecutionEvent::new(run_id, EventType::RunCancelled))
                .await?;
        } else {
            tracing::info!(
                "Workflow execution complete: run_id={}, duration_ms={}",
                run_id,
                duration_ms
            );
            self.events
                .emit(ExecutionEvent::new(
                    run_id,
                    EventType::RunCompleted { duration_ms },
                ))
                .await?;
        }

        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            executed: ctx.executed.into_inner(),
            outcomes: ctx.outcomes.into_inner(),
            cancelled,
            no_trigger: false,
        })
    }

    /// Stop the run in progress. Every node goes back to idle immediately and
    /// nothing the stopped run still has pending will change a status.
    pub fn stop(&self, store: &SharedStore) {
        if let Some((run_id, cancel_tx)) = self.active_run.lock().as_ref() {
            tracing::info!("Cancellation signal sent for run {}", run_id);
            cancel_tx.send(true).ok();
        }
        store.lock().reset_statuses();
    }

    /// Emit a node-level event. A failing sink is logged and never stops
    /// the traversal, so no node is left running.
    async fn notify(&self, event: ExecutionEvent) {
        if let Err(e) = self.events.emit(event).await {
            tracing::warn!("Failed to record execution event: {}", e);
        }
    }

    fn execute_node<'a>(&'a self, ctx: &'a RunContext<'a>, node_id: NodeId) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if ctx.is_cancelled() || !ctx.visit(&node_id) {
                return;
            }
            let Some(node) = ctx.nodes.get(&node_id) else {
                return;
            };

            if !ctx.set_status(&node_id, NodeStatus::Running) {
                return;
            }
            ctx.executed.lock().push(node_id.clone());
            tracing::debug!("Executing node {} ({})", node_id, node.node_type.id);

            self.notify(ExecutionEvent::new(
                ctx.run_id,
                EventType::NodeStarted {
                    node_id: node_id.clone(),
                },
            ))
            .await;

            let clock = Instant::now();
            if !ctx.pause(self.delays.delay(node)).await {
                return;
            }

            let outcome = self.outcomes.draw(node);
            let status = NodeStatus::from(outcome);
            if !ctx.set_status(&node_id, status) {
                return;
            }
            ctx.outcomes.lock().insert(node_id.clone(), status);

            let duration_ms = clock.elapsed().as_millis() as u64;
            let event_type = match outcome {
                Outcome::Success => EventType::NodeSucceeded {
                    node_id: node_id.clone(),
                    duration_ms,
                },
                Outcome::Error => EventType::NodeFailed {
                    node_id: node_id.clone(),
                    duration_ms,
                },
            };
            self.notify(ExecutionEvent::new(ctx.run_id, event_type))
                .await;

            if outcome == Outcome::Error {
                tracing::info!("Node {} failed, skipping its downstream nodes", node_id);
                return;
            }

            let branches = ctx
                .graph
                .successors(&node_id)
                .into_iter()
                .map(|next| self.execute_node(ctx, next));
            join_all(branches).await;
        })
    }
}

use crate::error::Result;
use crate::types::{NodeId, RunId};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub const RUN_STARTED_MESSAGE: &str = "Starting workflow execution...";
pub const RUN_COMPLETED_MESSAGE: &str = "Workflow execution complete.";
pub const RUN_STOPPED_MESSAGE: &str = "Workflow execution stopped.";

/// Something that happened during a simulated run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub id: String,
    pub run_id: RunId,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
}

impl ExecutionEvent {
    pub fn new(run_id: RunId, event_type: EventType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            run_id,
            timestamp: Utc::now(),
            event_type,
        }
    }

    /// Line for the log panel, for events that have one
    pub fn log_line(&self) -> Option<String> {
        let message = match &self.event_type {
            EventType::RunStarted { .. } => RUN_STARTED_MESSAGE,
            EventType::RunCompleted { .. } => RUN_COMPLETED_MESSAGE,
            EventType::RunCancelled => RUN_STOPPED_MESSAGE,
            _ => return None,
        };
        Some(format_log_line(self.timestamp, message))
    }
}

/// Types of events emitted by the simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventType {
    // Run lifecycle events
    RunStarted { trigger_count: usize },
    RunCompleted { duration_ms: u64 },
    RunCancelled,
    NoTrigger,

    // Node lifecycle events
    NodeStarted { node_id: NodeId },
    NodeSucceeded { node_id: NodeId, duration_ms: u64 },
    NodeFailed { node_id: NodeId, duration_ms: u64 },
}

/// `[<ISO-8601 timestamp>] <message>`
pub fn format_log_line(timestamp: DateTime<Utc>, message: &str) -> String {
    format!(
        "[{}] {}",
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        message
    )
}

/// Receiver of execution events
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: ExecutionEvent) -> Result<()>;
}

/// Event sink that keeps everything in memory
#[derive(Default)]
pub struct MemoryEventLog {
    events: RwLock<Vec<ExecutionEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<ExecutionEvent> {
        self.events.read().await.clone()
    }

    pub async fn run_events(&self, run_id: RunId) -> Vec<ExecutionEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.run_id == run_id)
            .cloned()
            .collect()
    }

    pub async fn log_lines(&self) -> Vec<String> {
        self.events
            .read()
            .await
            .iter()
            .filter_map(ExecutionEvent::log_line)
            .collect()
    }
}

#[async_trait::async_trait]
impl EventSink for MemoryEventLog {
    async fn emit(&self, event: ExecutionEvent) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

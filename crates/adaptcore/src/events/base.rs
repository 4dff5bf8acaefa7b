use crate::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Events emitted during workflow execution and model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    WorkflowStarted {
        execution_id: ExecutionId,
        workflow_id: String,
        strategy: String,
        timestamp: DateTime<Utc>,
    },
    WorkflowCompleted {
        execution_id: ExecutionId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        execution_id: ExecutionId,
        node_id: NodeId,
        node_kind: String,
        timestamp: DateTime<Utc>,
    },
    NodeCompleted {
        execution_id: ExecutionId,
        node_id: NodeId,
        result: Value,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    ModelSelected {
        model_key: String,
        modality: String,
        complexity_score: u32,
        timestamp: DateTime<Utc>,
    },
}

/// Event emitter bound to one execution
#[derive(Clone)]
pub struct EventEmitter {
    execution_id: ExecutionId,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new(execution_id: ExecutionId, sender: broadcast::Sender<ExecutionEvent>) -> Self {
        Self {
            execution_id,
            sender,
        }
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    pub fn node_started(&self, node_id: &str, node_kind: &str) {
        let _ = self.sender.send(ExecutionEvent::NodeStarted {
            execution_id: self.execution_id,
            node_id: node_id.to_string(),
            node_kind: node_kind.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn node_completed(&self, node_id: &str, result: &Value, duration_ms: u64) {
        let _ = self.sender.send(ExecutionEvent::NodeCompleted {
            execution_id: self.execution_id,
            node_id: node_id.to_string(),
            result: result.clone(),
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    pub fn model_selected(&self, model_key: &str, modality: &str, complexity_score: u32) {
        let _ = self.sender.send(ExecutionEvent::ModelSelected {
            model_key: model_key.to_string(),
            modality: modality.to_string(),
            complexity_score,
            timestamp: Utc::now(),
        });
    }
}

/// Global event bus
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn create_emitter(&self, execution_id: ExecutionId) -> EventEmitter {
        EventEmitter::new(execution_id, self.sender.clone())
    }
}

use crate::compositor::{Compositor, InferenceDefaults};
use crate::decider::ModelDecider;
use crate::dispatch::NodeDispatcher;
use crate::executor::{ExecuteRequest, ExecutionResponse, WorkflowExecutor};
use crate::registry::ToolRegistry;
use adaptcore::{
    EventBus, ExecutionEvent, ExecutionId, MessageExecutor, ToolInvoker, Workflow, WorkflowError,
    WorkflowStore,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Main runtime for executing workflows
pub struct FlowRuntime {
    store: Arc<dyn WorkflowStore>,
    executor: WorkflowExecutor,
    event_bus: Arc<EventBus>,
    config: RuntimeConfig,
}

impl FlowRuntime {
    /// Create a new runtime with default settings and no internal tools
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self::with_config(store, RuntimeConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(store: Arc<dyn WorkflowStore>, config: RuntimeConfig) -> Self {
        Self::with_registry(store, Arc::new(ToolRegistry::new()), config)
    }

    /// Create a new runtime with a pre-populated tool registry
    pub fn with_registry(
        store: Arc<dyn WorkflowStore>,
        registry: Arc<ToolRegistry>,
        config: RuntimeConfig,
    ) -> Self {
        let dispatcher = NodeDispatcher::new(registry, config.tool_batch_size);
        let executor =
            WorkflowExecutor::new(dispatcher, Compositor::default(), config.max_router_iterations);
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            store,
            executor,
            event_bus,
            config,
        }
    }

    /// Sampling defaults and Ollama endpoint for Model nodes that leave them unset
    pub fn with_inference_defaults(mut self, defaults: InferenceDefaults) -> Self {
        self.executor.set_compositor(Compositor::new(defaults));
        self
    }

    pub fn with_tool_invoker(mut self, invoker: Arc<dyn ToolInvoker>) -> Self {
        self.executor.dispatcher_mut().set_invoker(invoker);
        self
    }

    pub fn with_message_executor(mut self, executor: Arc<dyn MessageExecutor>) -> Self {
        self.executor.set_message_executor(executor);
        self
    }

    /// Enables `modelId: "auto"` on Model nodes
    pub fn with_decider(mut self, decider: Arc<dyn ModelDecider>) -> Self {
        self.executor.set_decider(decider);
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.executor.dispatcher().registry()
    }

    pub fn executor(&self) -> &WorkflowExecutor {
        &self.executor
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Fetch the graph from the store and run it
    pub async fn execute(&self, request: ExecuteRequest) -> ExecutionResponse {
        match self.store.get_workflow(&request.workflow_id).await {
            Some(workflow) => self.execute_workflow(&workflow, &request).await,
            None => {
                tracing::warn!("Workflow not found: {}", request.workflow_id);
                let error = WorkflowError::NotFound(request.workflow_id.clone());
                ExecutionResponse::failed(ExecutionId::new_v4(), error, 0)
            }
        }
    }

    /// Execute a workflow directly (without the store)
    pub async fn execute_workflow(
        &self,
        workflow: &Workflow,
        request: &ExecuteRequest,
    ) -> ExecutionResponse {
        self.executor.execute(workflow, request, &self.event_bus).await
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    /// Get the event bus for direct access
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_max_router_iterations")]
    pub max_router_iterations: usize,
    /// Concurrent invocations per batched tool node
    #[serde(default = "default_tool_batch_size")]
    pub tool_batch_size: usize,
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_router_iterations: default_max_router_iterations(),
            tool_batch_size: default_tool_batch_size(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

fn default_max_router_iterations() -> usize {
    100
}

fn default_tool_batch_size() -> usize {
    5
}

fn default_event_buffer_size() -> usize {
    1000
}

use crate::compositor::{ComposeOptions, Compositor};
use crate::decider::ModelDecider;
use crate::dispatch::{NodeDispatcher, ResolvedResults};
use crate::router;
use adaptcore::{
    EventBus, EventEmitter, ExecutionEvent, ExecutionId, FlowError, MessageExecutor, Node,
    NodeConfig, NodeId, NodeKind, Workflow, WorkflowError, WorkflowId,
};
use adaptselect::{Modality, SelectionOptions, UnifiedRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Which execution path a graph takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStrategy {
    /// Compose once, call the model once
    PromptModel,
    /// Walk from the entry node, letting Router nodes pick the next hop
    Router,
    /// Resolve terminal nodes through their dependencies
    Dag,
}

impl ExecutionStrategy {
    pub fn for_workflow(workflow: &Workflow) -> Self {
        if workflow.has_kind(NodeKind::Router) {
            ExecutionStrategy::Router
        } else if workflow.has_kind(NodeKind::Prompt)
            && (workflow.has_kind(NodeKind::Model) || workflow.has_kind(NodeKind::ModelSet))
        {
            ExecutionStrategy::PromptModel
        } else {
            ExecutionStrategy::Dag
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStrategy::PromptModel => "prompt-model",
            ExecutionStrategy::Router => "router",
            ExecutionStrategy::Dag => "dag",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[serde(default)]
    pub workflow_id: WorkflowId,
    #[serde(default)]
    pub input: Value,
    /// Template values for PromptText placeholders
    #[serde(default)]
    pub runtime_inputs: Map<String, Value>,
    /// Used when a Model node asks for `modelId: "auto"`
    #[serde(default)]
    pub selection_options: SelectionOptions,
}

impl ExecuteRequest {
    pub fn new(workflow_id: impl Into<WorkflowId>, input: impl Into<Value>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_runtime_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.runtime_inputs.insert(key.into(), value.into());
        self
    }

    pub fn with_selection(mut self, options: SelectionOptions) -> Self {
        self.selection_options = options;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLogEntry {
    pub node_id: NodeId,
    pub node_kind: String,
    pub label: String,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub result: Value,
}

/// Outcome of one run, as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResponse {
    pub execution_id: ExecutionId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ExecutionStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default)]
    pub execution_log: Vec<ExecutionLogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "executionTime")]
    pub execution_time_ms: u64,
}

impl ExecutionResponse {
    pub fn failed(execution_id: ExecutionId, error: impl ToString, execution_time_ms: u64) -> Self {
        Self {
            execution_id,
            success: false,
            strategy: None,
            result: None,
            execution_log: Vec::new(),
            error: Some(error.to_string()),
            execution_time_ms,
        }
    }
}

/// State of a single run. Created per execution and dropped when it returns.
pub(crate) struct RunContext<'a> {
    pub workflow: &'a Workflow,
    pub request: &'a ExecuteRequest,
    pub emitter: EventEmitter,
    log: Mutex<Vec<ExecutionLogEntry>>,
}

impl<'a> RunContext<'a> {
    fn new(workflow: &'a Workflow, request: &'a ExecuteRequest, emitter: EventEmitter) -> Self {
        Self {
            workflow,
            request,
            emitter,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn input(&self) -> &Value {
        &self.request.input
    }

    pub fn record(&self, node: &Node, duration_ms: u64, result: &Value) {
        let entry = ExecutionLogEntry {
            node_id: node.id.clone(),
            node_kind: node.kind_name().to_string(),
            label: node.label.clone(),
            duration_ms,
            timestamp: Utc::now(),
            result: result.clone(),
        };
        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }

    fn into_log(self) -> Vec<ExecutionLogEntry> {
        self.log
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Runs graphs using one of the three strategies
pub struct WorkflowExecutor {
    dispatcher: NodeDispatcher,
    compositor: Compositor,
    message_executor: Option<Arc<dyn MessageExecutor>>,
    decider: Option<Arc<dyn ModelDecider>>,
    max_router_iterations: usize,
}

impl WorkflowExecutor {
    pub fn new(dispatcher: NodeDispatcher, compositor: Compositor, max_router_iterations: usize) -> Self {
        Self {
            dispatcher,
            compositor,
            message_executor: None,
            decider: None,
            max_router_iterations,
        }
    }

    pub fn set_message_executor(&mut self, executor: Arc<dyn MessageExecutor>) {
        self.message_executor = Some(executor);
    }

    pub fn set_decider(&mut self, decider: Arc<dyn ModelDecider>) {
        self.decider = Some(decider);
    }

    pub fn set_compositor(&mut self, compositor: Compositor) {
        self.compositor = compositor;
    }

    pub fn dispatcher(&self) -> &NodeDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut NodeDispatcher {
        &mut self.dispatcher
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Execute a workflow and return results. Never panics on graph errors;
    /// they are reported in the response.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        request: &ExecuteRequest,
        event_bus: &EventBus,
    ) -> ExecutionResponse {
        let execution_id = ExecutionId::new_v4();
        let start_time = Instant::now();
        let strategy = ExecutionStrategy::for_workflow(workflow);

        event_bus.emit(ExecutionEvent::WorkflowStarted {
            execution_id,
            workflow_id: request.workflow_id.clone(),
            strategy: strategy.as_str().to_string(),
            timestamp: Utc::now(),
        });

        tracing::info!(
            "Starting workflow execution: {} ({} strategy, {} nodes)",
            request.workflow_id,
            strategy.as_str(),
            workflow.nodes.len()
        );

        let run = RunContext::new(workflow, request, event_bus.create_emitter(execution_id));
        let outcome = match strategy {
            ExecutionStrategy::PromptModel => self.execute_prompt_model(&run).await,
            ExecutionStrategy::Router => self.execute_router(&run).await,
            ExecutionStrategy::Dag => self.execute_dag(&run).await,
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        event_bus.emit(ExecutionEvent::WorkflowCompleted {
            execution_id,
            success: outcome.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        let execution_log = run.into_log();
        match outcome {
            Ok(result) => {
                tracing::info!("Workflow {} completed in {}ms", request.workflow_id, duration_ms);
                ExecutionResponse {
                    execution_id,
                    success: true,
                    strategy: Some(strategy),
                    result: Some(result),
                    execution_log,
                    error: None,
                    execution_time_ms: duration_ms,
                }
            }
            Err(e) => {
                tracing::error!("Workflow {} failed: {}", request.workflow_id, e);
                ExecutionResponse {
                    strategy: Some(strategy),
                    execution_log,
                    ..ExecutionResponse::failed(execution_id, e, duration_ms)
                }
            }
        }
    }

    /// Dispatch one node, with events and a log entry
    pub(crate) async fn run_node(
        &self,
        run: &RunContext<'_>,
        node: &Node,
        input: Value,
        resolved: &dyn ResolvedResults,
    ) -> Value {
        run.emitter.node_started(&node.id, node.kind_name());
        tracing::debug!("Executing node {} ({})", node.id, node.kind_name());

        let start = Instant::now();
        let result = self.dispatcher.dispatch(node, input, resolved).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        run.emitter.node_completed(&node.id, &result, duration_ms);
        run.record(node, duration_ms, &result);
        result
    }

    async fn execute_prompt_model(&self, run: &RunContext<'_>) -> Result<Value, FlowError> {
        let executor = self
            .message_executor
            .as_ref()
            .ok_or_else(|| FlowError::Execution("No message executor configured".to_string()))?;

        let mut workflow = run.workflow.clone();
        self.resolve_auto_models(&mut workflow, run).await?;

        let mut runtime_inputs = run.request.runtime_inputs.clone();
        runtime_inputs
            .entry("input")
            .or_insert_with(|| run.input().clone());
        let options = ComposeOptions {
            prompt_id: None,
            runtime_inputs,
        };
        let composed = self.compositor.compose(&workflow.nodes, &workflow.edges, &options)?;

        run.emitter.node_started(&composed.prompt_id, NodeKind::Prompt.as_str());
        let start = Instant::now();
        let reply = executor.execute_composed(&composed).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = json!({
            "text": reply.text,
            "promptId": composed.prompt_id,
            "target": composed.target_name(),
            "modelId": composed.target.model_id(),
            "raw": reply.raw,
        });
        run.emitter.node_completed(&composed.prompt_id, &result, duration_ms);
        if let Some(prompt) = workflow.find_node(&composed.prompt_id) {
            run.record(prompt, duration_ms, &result);
        }
        Ok(result)
    }

    /// Replace `modelId: "auto"` with the decider's pick
    async fn resolve_auto_models(
        &self,
        workflow: &mut Workflow,
        run: &RunContext<'_>,
    ) -> Result<(), FlowError> {
        let has_auto = workflow
            .nodes
            .iter()
            .any(|n| matches!(&n.config, NodeConfig::Model(m) if m.is_auto()));
        if !has_auto {
            return Ok(());
        }
        let Some(decider) = &self.decider else {
            tracing::warn!("Model node asks for an automatic model but no decider is configured");
            return Ok(());
        };

        let mut request = UnifiedRequest::new(input_text(run.input()));
        request.modality_override = Some(Modality::Text);
        request.selection_options = run.request.selection_options.clone();
        let decision = decider
            .decide(&request)
            .await
            .map_err(|e| FlowError::Selection(e.to_string()))?;

        let selected = &decision.selected_model;
        run.emitter
            .model_selected(&selected.key(), decision.modality.as_str(), decision.complexity_score);
        tracing::info!(
            "Resolved automatic model to {} (complexity {})",
            selected.key(),
            decision.complexity_score
        );

        for node in &mut workflow.nodes {
            if let NodeConfig::Model(model) = &mut node.config {
                if model.is_auto() {
                    model.provider = selected.provider;
                    model.model_id = selected.model_id.clone();
                }
            }
        }
        Ok(())
    }

    async fn execute_router(&self, run: &RunContext<'_>) -> Result<Value, FlowError> {
        let workflow = run.workflow;
        let entries: Vec<&Node> = workflow
            .nodes
            .iter()
            .filter(|n| workflow.incoming(&n.id).next().is_none())
            .collect();
        let [entry] = entries.as_slice() else {
            return Err(WorkflowError::InvalidEntryPoint { found: entries.len() }.into());
        };

        let mut current: NodeId = entry.id.clone();
        let mut value = run.input().clone();
        let mut results: HashMap<NodeId, Value> = HashMap::new();

        for _ in 0..self.max_router_iterations {
            let node = workflow
                .find_node(&current)
                .ok_or_else(|| WorkflowError::NodeNotFound(current.clone()))?;

            let next = match &node.config {
                NodeConfig::Router(config) => {
                    run.emitter.node_started(&node.id, node.kind_name());
                    let start = Instant::now();
                    let next = router::next_node(&node.id, config, &value, workflow);
                    let duration_ms = start.elapsed().as_millis() as u64;

                    let hop = json!({ "nextNode": next });
                    run.emitter.node_completed(&node.id, &hop, duration_ms);
                    run.record(node, duration_ms, &hop);
                    next
                }
                _ => {
                    value = self.run_node(run, node, value, &results).await;
                    results.insert(node.id.clone(), value.clone());
                    workflow.outgoing(&node.id).next().map(|e| e.target.clone())
                }
            };

            match next {
                Some(next) => current = next,
                None => return Ok(value),
            }
        }

        tracing::warn!(
            "Router stopped at node {} after {} iterations",
            current,
            self.max_router_iterations
        );
        Ok(value)
    }
}

/// Text the decider scores: strings as-is, anything else as JSON
pub(crate) fn input_text(input: &Value) -> String {
    match input {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

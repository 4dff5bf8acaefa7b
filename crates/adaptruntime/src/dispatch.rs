use crate::registry::ToolRegistry;
use adaptcore::{
    CallPolicy, MemoryConfig, Node, NodeConfig, NodeId, ToolCall, ToolConfig, ToolError,
    ToolInvoker, ToolSetConfig,
};
use futures::stream::{self, StreamExt};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Results of nodes that already ran in the current execution
pub trait ResolvedResults: Sync {
    fn result_of(&self, id: &str) -> Option<Value>;
}

impl ResolvedResults for HashMap<NodeId, Value> {
    fn result_of(&self, id: &str) -> Option<Value> {
        self.get(id).cloned()
    }
}

impl ResolvedResults for HashMap<NodeId, Arc<OnceCell<Value>>> {
    fn result_of(&self, id: &str) -> Option<Value> {
        self.get(id).and_then(|cell| cell.get().cloned())
    }
}

/// Executes a single node given its input value
pub struct NodeDispatcher {
    registry: Arc<ToolRegistry>,
    invoker: Option<Arc<dyn ToolInvoker>>,
    batch_size: usize,
}

impl NodeDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, batch_size: usize) -> Self {
        Self {
            registry,
            invoker: None,
            batch_size: batch_size.max(1),
        }
    }

    pub fn with_invoker(mut self, invoker: Arc<dyn ToolInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn set_invoker(&mut self, invoker: Arc<dyn ToolInvoker>) {
        self.invoker = Some(invoker);
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Never fails: tool errors become `{success: false, error, toolType}`
    pub async fn dispatch(&self, node: &Node, input: Value, resolved: &dyn ResolvedResults) -> Value {
        match &node.config {
            NodeConfig::Tool(tool) => self.run_tool(node, tool, input).await,
            NodeConfig::ToolSet(set) => tool_set(set, resolved),
            NodeConfig::Memory(memory) => memory_descriptor(memory, input),
            NodeConfig::Unknown { kind, .. } => json!({ "nodeKind": kind, "input": input }),
            config => json!({
                "nodeKind": node.kind_name(),
                "config": config.to_json(),
                "input": input,
            }),
        }
    }

    async fn run_tool(&self, node: &Node, tool: &ToolConfig, input: Value) -> Value {
        let (params, batch) = match tool {
            ToolConfig::Internal { params, batch, .. } | ToolConfig::Mcp { params, batch, .. } => {
                (params, batch)
            }
            ToolConfig::OpenApi { operation, .. } => {
                tracing::debug!("Node {} requested an OpenAPI tool", node.id);
                return json!({
                    "success": false,
                    "toolType": "openapi",
                    "operation": operation,
                    "error": "OpenAPI tools are not implemented",
                });
            }
        };

        let call_for = |extra: Option<&Map<String, Value>>| {
            let mut merged = params.clone();
            if let Some(extra) = extra {
                merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            merged.insert("input".to_string(), input.clone());
            tool_call(tool, merged)
        };

        if batch.is_empty() {
            return self.invoke(node, call_for(None)).await;
        }

        let calls: Vec<ToolCall> = batch.iter().map(|item| call_for(Some(item))).collect();
        tracing::debug!("Node {} running {} batched tool calls", node.id, calls.len());
        let results: Vec<Value> = stream::iter(calls)
            .map(|call| async move { self.invoke(node, call).await })
            .buffered(self.batch_size)
            .collect()
            .await;
        Value::Array(results)
    }

    async fn invoke(&self, node: &Node, call: ToolCall) -> Value {
        match self.call(&call).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Node {} {} tool failed: {}", node.id, call.type_name(), e);
                json!({
                    "success": false,
                    "error": e.to_string(),
                    "toolType": call.type_name(),
                })
            }
        }
    }

    /// Registered internal tools run in-process; everything else goes to the invoker
    pub async fn call(&self, call: &ToolCall) -> Result<Value, ToolError> {
        if let ToolCall::Internal { name, params } = call {
            if let Some(tool) = self.registry.get(name) {
                return tool.call(params.clone()).await;
            }
        }
        match &self.invoker {
            Some(invoker) => invoker.invoke_tool(call).await,
            None => Err(match call {
                ToolCall::Internal { name, .. } => ToolError::UnknownTool(name.clone()),
                other => ToolError::NotImplemented(format!(
                    "no tool invoker configured for {} tools",
                    other.type_name()
                )),
            }),
        }
    }
}

fn tool_call(tool: &ToolConfig, params: Map<String, Value>) -> ToolCall {
    match tool {
        ToolConfig::Internal { name, .. } => ToolCall::Internal {
            name: name.clone(),
            params,
        },
        ToolConfig::Mcp { server, tool, .. } => ToolCall::Mcp {
            server: server.clone(),
            tool: tool.clone(),
            params,
        },
        ToolConfig::OpenApi { operation, .. } => ToolCall::OpenApi {
            operation: operation.clone(),
            params,
        },
    }
}

fn tool_set(set: &ToolSetConfig, resolved: &dyn ResolvedResults) -> Value {
    match set.call_policy {
        CallPolicy::ToolFirst => Value::Array(
            set.allow_list
                .iter()
                .filter_map(|id| resolved.result_of(id))
                .collect(),
        ),
        policy @ (CallPolicy::ModelFirst | CallPolicy::Interleave) => json!({
            "callPolicy": policy,
            "availableTools": set.allow_list.len(),
            "tools": set.allow_list,
        }),
    }
}

fn memory_descriptor(memory: &MemoryConfig, input: Value) -> Value {
    json!({
        "nodeKind": "memory",
        "source": memory.source,
        "index": memory.index,
        "topK": memory.top_k,
        "input": input,
    })
}

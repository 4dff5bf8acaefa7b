//! Standard tool and collaborator library
//!
//! Built-in internal tools for common operations, plus the concrete
//! collaborators the binaries wire into the runtime: MCP tool invoker,
//! Bedrock/Ollama message executor, workflow store, tier resolver and
//! rate limiter.

mod debug;
mod http;
mod limits;
mod mcp;
mod provider;
mod store;
mod text;
mod time;
mod transform;

pub use debug::DebugLogTool;
pub use http::HttpRequestTool;
pub use limits::{FixedWindowRateLimiter, StaticTierResolver};
pub use mcp::McpToolInvoker;
pub use provider::ProviderExecutor;
pub use store::{read_workflow, InMemoryWorkflowStore, StoreError};
pub use text::{TemplateTool, WordCountTool};
pub use time::{DelayTool, NowTool};
pub use transform::{JsonExtractTool, JsonParseTool, JsonStringifyTool};

use adaptruntime::ToolRegistry;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Register all standard tools with a registry
pub fn register_all(registry: &mut ToolRegistry) {
    registry.register(Arc::new(DebugLogTool));
    registry.register(Arc::new(HttpRequestTool::new()));
    registry.register(Arc::new(JsonParseTool));
    registry.register(Arc::new(JsonStringifyTool));
    registry.register(Arc::new(JsonExtractTool));
    registry.register(Arc::new(WordCountTool));
    registry.register(Arc::new(TemplateTool));
    registry.register(Arc::new(DelayTool));
    registry.register(Arc::new(NowTool));
}

/// Named parameter, falling back to the node's upstream `input`
pub(crate) fn param_or_input<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    params
        .get(key)
        .or_else(|| params.get("input"))
        .filter(|v| !v.is_null())
}

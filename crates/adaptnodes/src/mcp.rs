use adaptcore::{ToolCall, ToolError, ToolInvoker};
use adaptruntime::McpConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Calls MCP tools over JSON-RPC `tools/call`, one HTTP endpoint per server
pub struct McpToolInvoker {
    http: reqwest::Client,
    servers: HashMap<String, String>,
    next_id: AtomicU64,
}

impl McpToolInvoker {
    pub fn new(config: &McpConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: &McpConfig) -> Self {
        Self {
            http,
            servers: config.servers.clone(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn servers(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: &serde_json::Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let url = self
            .servers
            .get(server)
            .ok_or_else(|| ToolError::UnknownServer(server.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": tool, "arguments": arguments },
        });

        tracing::debug!(server, tool, id, "MCP tools/call");

        let response = self
            .http
            .post(url)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("MCP request to {} failed: {}", server, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ToolError::ExecutionFailed(format!("HTTP {}: {}", status, text)));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Invalid MCP response: {}", e)))?;
        tool_result(reply)
    }
}

#[async_trait]
impl ToolInvoker for McpToolInvoker {
    async fn invoke_tool(&self, call: &ToolCall) -> Result<Value, ToolError> {
        match call {
            ToolCall::Mcp {
                server,
                tool,
                params,
            } => self.call_tool(server, tool, params).await,
            ToolCall::Internal { name, .. } => Err(ToolError::UnknownTool(name.clone())),
            ToolCall::OpenApi { .. } => Err(ToolError::NotImplemented(
                "OpenAPI tools are not implemented".to_string(),
            )),
        }
    }
}

/// Unwrap a JSON-RPC reply into the tool's value.
///
/// `structuredContent` wins when present; otherwise text content blocks are
/// joined, and parsed as JSON when they hold a single JSON document.
fn tool_result(reply: Value) -> Result<Value, ToolError> {
    if let Some(error) = reply.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ToolError::ExecutionFailed(format!("MCP error: {}", message)));
    }

    let result = reply
        .get("result")
        .ok_or_else(|| ToolError::ExecutionFailed("MCP reply has no result".to_string()))?;

    let text = result
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(ToolError::ExecutionFailed(text));
    }
    if let Some(structured) = result.get("structuredContent") {
        return Ok(structured.clone());
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[tokio::test]
    async fn unknown_server_fails_without_io() {
        let invoker = McpToolInvoker::new(&McpConfig::default());
        let call = ToolCall::Mcp {
            server: "nowhere".to_string(),
            tool: "search".to_string(),
            params: Map::new(),
        };
        assert_eq!(
            invoker.invoke_tool(&call).await.unwrap_err(),
            ToolError::UnknownServer("nowhere".to_string())
        );
    }

    #[test]
    fn text_content_is_joined_and_parsed() {
        let reply = json!({"jsonrpc": "2.0", "id": 1, "result": {
            "content": [{"type": "text", "text": "plain answer"}]
        }});
        assert_eq!(tool_result(reply).unwrap(), json!("plain answer"));

        let reply = json!({"result": {"content": [{"type": "text", "text": "{\"hits\": 2}"}]}});
        assert_eq!(tool_result(reply).unwrap(), json!({"hits": 2}));
    }

    #[test]
    fn structured_content_and_errors() {
        let reply = json!({"result": {"content": [], "structuredContent": {"ok": true}}});
        assert_eq!(tool_result(reply).unwrap(), json!({"ok": true}));

        let reply = json!({"result": {"isError": true, "content": [{"type": "text", "text": "bad query"}]}});
        assert_eq!(
            tool_result(reply).unwrap_err(),
            ToolError::ExecutionFailed("bad query".to_string())
        );

        let reply = json!({"error": {"code": -32601, "message": "Method not found"}});
        assert_eq!(
            tool_result(reply).unwrap_err(),
            ToolError::ExecutionFailed("MCP error: Method not found".to_string())
        );
    }
}

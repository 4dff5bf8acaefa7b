use adaptcore::ToolError;
use adaptruntime::{InternalTool, ParamDefinition, ToolMetadata};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tokio::time::{sleep, Duration};

const MAX_DELAY_MS: u64 = 60_000;

/// Delay execution for a specified duration, then pass the input through
pub struct DelayTool;

#[async_trait]
impl InternalTool for DelayTool {
    fn name(&self) -> &str {
        "time.delay"
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            description: "Delay execution for specified milliseconds".to_string(),
            category: "time".to_string(),
            params: vec![ParamDefinition::optional("delay_ms", "Milliseconds to wait, default 1000")],
        }
    }

    async fn call(&self, params: Map<String, Value>) -> Result<Value, ToolError> {
        let delay_ms = params
            .get("delay_ms")
            .and_then(Value::as_u64)
            .unwrap_or(1000)
            .min(MAX_DELAY_MS);

        tracing::debug!("Delaying for {}ms", delay_ms);
        sleep(Duration::from_millis(delay_ms)).await;

        Ok(params.get("input").cloned().unwrap_or(Value::Null))
    }
}

/// Current UTC time
pub struct NowTool;

#[async_trait]
impl InternalTool for NowTool {
    fn name(&self) -> &str {
        "time.now"
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            description: "Current UTC time as RFC 3339 and unix seconds".to_string(),
            category: "time".to_string(),
            params: Vec::new(),
        }
    }

    async fn call(&self, _params: Map<String, Value>) -> Result<Value, ToolError> {
        let now = Utc::now();
        Ok(json!({
            "timestamp": now.to_rfc3339(),
            "unix": now.timestamp(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delay_passes_input_through() {
        let mut params = Map::new();
        params.insert("delay_ms".to_string(), json!(1));
        params.insert("input".to_string(), json!("kept"));
        assert_eq!(DelayTool.call(params).await.unwrap(), json!("kept"));
    }
}

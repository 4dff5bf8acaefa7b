use adaptcore::ToolError;
use adaptruntime::{InternalTool, ParamDefinition, ToolMetadata};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// Logs its message and parameters, then returns the message
pub struct DebugLogTool;

#[async_trait]
impl InternalTool for DebugLogTool {
    fn name(&self) -> &str {
        "debug.log"
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            description: "Logs input values for debugging".to_string(),
            category: "debug".to_string(),
            params: vec![ParamDefinition::optional("message", "Text to log; defaults to the input")],
        }
    }

    async fn call(&self, params: Map<String, Value>) -> Result<Value, ToolError> {
        let message = match crate::param_or_input(&params, "message") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "(no message)".to_string(),
        };

        tracing::info!("DEBUG: {}", message);
        for (key, value) in &params {
            tracing::debug!("  {}: {}", key, value);
        }

        Ok(json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_input() {
        let mut params = Map::new();
        params.insert("input".to_string(), json!({"a": 1}));
        let out = DebugLogTool.call(params).await.unwrap();
        assert_eq!(out["message"], r#"{"a":1}"#);

        let out = DebugLogTool.call(Map::new()).await.unwrap();
        assert_eq!(out["message"], "(no message)");
    }
}

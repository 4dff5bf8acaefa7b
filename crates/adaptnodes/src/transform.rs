use adaptcore::ToolError;
use adaptruntime::{InternalTool, ParamDefinition, ToolMetadata};
use async_trait::async_trait;
use serde_json::{Map, Value};

fn transform_metadata(description: &str, params: Vec<ParamDefinition>) -> ToolMetadata {
    ToolMetadata {
        description: description.to_string(),
        category: "transform".to_string(),
        params,
    }
}

/// Parse JSON string to a value
pub struct JsonParseTool;

#[async_trait]
impl InternalTool for JsonParseTool {
    fn name(&self) -> &str {
        "transform.json_parse"
    }

    fn metadata(&self) -> ToolMetadata {
        transform_metadata(
            "Parse JSON string",
            vec![ParamDefinition::optional("json", "JSON text; defaults to the input")],
        )
    }

    async fn call(&self, params: Map<String, Value>) -> Result<Value, ToolError> {
        let input = crate::param_or_input(&params, "json")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidParams("'json' must be a string".to_string()))?;

        serde_json::from_str(input)
            .map_err(|e| ToolError::ExecutionFailed(format!("JSON parse error: {}", e)))
    }
}

/// Stringify a value to JSON
pub struct JsonStringifyTool;

#[async_trait]
impl InternalTool for JsonStringifyTool {
    fn name(&self) -> &str {
        "transform.json_stringify"
    }

    fn metadata(&self) -> ToolMetadata {
        transform_metadata(
            "Convert value to JSON string",
            vec![
                ParamDefinition::optional("value", "Value to encode; defaults to the input"),
                ParamDefinition::optional("pretty", "Indent the output"),
            ],
        )
    }

    async fn call(&self, params: Map<String, Value>) -> Result<Value, ToolError> {
        let value = crate::param_or_input(&params, "value").unwrap_or(&Value::Null);
        let pretty = params.get("pretty").and_then(Value::as_bool).unwrap_or(false);

        let json_str = if pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
        .map_err(|e| ToolError::ExecutionFailed(format!("JSON stringify error: {}", e)))?;

        Ok(Value::String(json_str))
    }
}

/// Pull one field out of a value by dotted path; array indices are numbers
pub struct JsonExtractTool;

#[async_trait]
impl InternalTool for JsonExtractTool {
    fn name(&self) -> &str {
        "transform.json_extract"
    }

    fn metadata(&self) -> ToolMetadata {
        transform_metadata(
            "Extract a field by dotted path, e.g. items.0.name",
            vec![
                ParamDefinition::required("path", "Dotted path into the value"),
                ParamDefinition::optional("value", "Source value; defaults to the input"),
            ],
        )
    }

    async fn call(&self, params: Map<String, Value>) -> Result<Value, ToolError> {
        let path = params
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidParams("'path' is required".to_string()))?;
        let source = crate::param_or_input(&params, "value").unwrap_or(&Value::Null);

        Ok(extract(source, path).cloned().unwrap_or(Value::Null))
    }
}

fn extract<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            other => other.get(segment),
        })
}

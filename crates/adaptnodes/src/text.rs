use adaptcore::ToolError;
use adaptruntime::{render_template, InternalTool, ParamDefinition, ToolMetadata};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

pub struct WordCountTool;

#[async_trait]
impl InternalTool for WordCountTool {
    fn name(&self) -> &str {
        "text.word_count"
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            description: "Count words, characters and lines".to_string(),
            category: "text".to_string(),
            params: vec![ParamDefinition::optional("text", "Text to count; defaults to the input")],
        }
    }

    async fn call(&self, params: Map<String, Value>) -> Result<Value, ToolError> {
        let text = crate::param_or_input(&params, "text")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidParams("'text' must be a string".to_string()))?;

        Ok(json!({
            "words": text.split_whitespace().count(),
            "characters": text.chars().count(),
            "lines": text.lines().count(),
        }))
    }
}

/// Renders `{{name}}` placeholders from the other parameters
pub struct TemplateTool;

#[async_trait]
impl InternalTool for TemplateTool {
    fn name(&self) -> &str {
        "text.template"
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            description: "Render a {{placeholder}} template from parameters".to_string(),
            category: "text".to_string(),
            params: vec![ParamDefinition::required("template", "Template text")],
        }
    }

    async fn call(&self, params: Map<String, Value>) -> Result<Value, ToolError> {
        let template = params
            .get("template")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidParams("'template' is required".to_string()))?;

        Ok(Value::String(render_template(template, &params)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_words() {
        let mut params = Map::new();
        params.insert("input".to_string(), json!("one two\nthree"));
        let out = WordCountTool.call(params).await.unwrap();
        assert_eq!(out, json!({"words": 3, "characters": 13, "lines": 2}));
    }

    #[tokio::test]
    async fn template_sees_input() {
        let mut params = Map::new();
        params.insert("template".to_string(), json!("Dear {{name}}, re: {{input}}"));
        params.insert("name".to_string(), json!("Ada"));
        params.insert("input".to_string(), json!("engines"));
        let out = TemplateTool.call(params).await.unwrap();
        assert_eq!(out, json!("Dear Ada, re: engines"));
    }
}

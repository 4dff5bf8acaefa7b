use adaptcore::ToolError;
use adaptruntime::{InternalTool, ParamDefinition, ToolMetadata};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// Plain HTTP request tool
pub struct HttpRequestTool {
    client: reqwest::Client,
}

impl HttpRequestTool {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpRequestTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InternalTool for HttpRequestTool {
    fn name(&self) -> &str {
        "http.request"
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            description: "Make HTTP requests".to_string(),
            category: "http".to_string(),
            params: vec![
                ParamDefinition::required("url", "Request URL"),
                ParamDefinition::optional("method", "GET, POST, PUT or DELETE; default GET"),
                ParamDefinition::optional("body", "JSON or text body for POST and PUT"),
                ParamDefinition::optional("headers", "Object of header names to values"),
            ],
        }
    }

    async fn call(&self, params: Map<String, Value>) -> Result<Value, ToolError> {
        let url = params
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidParams("'url' must be a string".to_string()))?;
        let method = params.get("method").and_then(Value::as_str).unwrap_or("GET");

        tracing::info!("{} {}", method, url);

        let request = match method.to_uppercase().as_str() {
            "GET" => self.client.get(url),
            "DELETE" => self.client.delete(url),
            "POST" => with_body(self.client.post(url), params.get("body")),
            "PUT" => with_body(self.client.put(url), params.get("body")),
            _ => {
                return Err(ToolError::InvalidParams(format!(
                    "Unsupported method: {}",
                    method
                )))
            }
        };

        let request = match params.get("headers") {
            Some(Value::Object(headers)) => headers.iter().fold(request, |req, (key, value)| {
                match value.as_str() {
                    Some(v) => req.header(key.as_str(), v),
                    None => req,
                }
            }),
            _ => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let headers: Map<String, Value> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_str().unwrap_or("").to_string())))
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to read response: {}", e)))?;

        tracing::debug!("Response status: {}", status);

        Ok(json!({
            "status": status,
            "body": body,
            "headers": headers,
        }))
    }
}

fn with_body(request: reqwest::RequestBuilder, body: Option<&Value>) -> reqwest::RequestBuilder {
    match body {
        Some(Value::String(text)) => request.body(text.clone()),
        Some(Value::Null) | None => request,
        Some(json) => request.json(json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unknown_method_before_sending() {
        let mut params = Map::new();
        params.insert("url".to_string(), json!("http://127.0.0.1:9"));
        params.insert("method".to_string(), json!("BREW"));
        let err = HttpRequestTool::new().call(params).await.unwrap_err();
        assert_eq!(err, ToolError::InvalidParams("Unsupported method: BREW".to_string()));
    }

    #[tokio::test]
    async fn requires_url() {
        let err = HttpRequestTool::new().call(Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}

//! Provider calls for composed messages.
//!
//! Bedrock goes through the Converse API with a bearer API key taken from
//! the environment. Ollama goes through `/api/chat` with streaming off.

use adaptcore::{
    BedrockRequest, ComposedMessage, ComposedTarget, MessageExecutor, OllamaRequest,
    ProviderError, ProviderReply,
};
use adaptruntime::ProvidersConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub struct ProviderExecutor {
    http: reqwest::Client,
    bedrock_region: String,
    bedrock_token_env: String,
}

impl ProviderExecutor {
    pub fn new(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: &ProvidersConfig) -> Self {
        Self {
            http,
            bedrock_region: config.bedrock_region.clone(),
            bedrock_token_env: config.bedrock_token_env.clone(),
        }
    }

    fn bedrock_token(&self) -> Result<String, ProviderError> {
        std::env::var(&self.bedrock_token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingCredentials {
                provider: "bedrock".to_string(),
                variable: self.bedrock_token_env.clone(),
            })
    }

    async fn converse(&self, request: &BedrockRequest) -> Result<ProviderReply, ProviderError> {
        let token = self.bedrock_token()?;
        let url = format!(
            "https://bedrock-runtime.{}.amazonaws.com/model/{}/converse",
            self.bedrock_region, request.model_id
        );

        let mut body = json!({
            "messages": request.messages,
            "inferenceConfig": request.inference_config,
        });
        if !request.system.is_empty() {
            body["system"] = json!(request.system);
        }

        tracing::debug!(model = %request.model_id, region = %self.bedrock_region, "Bedrock converse");
        let raw = self.post_json(&url, Some(&token), &body).await?;
        let text = bedrock_text(&raw)?;
        Ok(ProviderReply { text, raw })
    }

    async fn chat(&self, request: &OllamaRequest) -> Result<ProviderReply, ProviderError> {
        let url = format!("{}/api/chat", request.endpoint.trim_end_matches('/'));
        let body = json!({
            "model": request.model,
            "messages": request.messages,
            "stream": false,
            "options": request.options,
        });

        tracing::debug!(model = %request.model, endpoint = %request.endpoint, "Ollama chat");
        let raw = self.post_json(&url, None, &body).await?;
        let text = ollama_text(&raw)?;
        Ok(ProviderReply { text, raw })
    }

    async fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<Value, ProviderError> {
        let mut request = self.http.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ProviderError::Status { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl MessageExecutor for ProviderExecutor {
    async fn execute_composed(
        &self,
        message: &ComposedMessage,
    ) -> Result<ProviderReply, ProviderError> {
        match &message.target {
            ComposedTarget::Bedrock(request) => self.converse(request).await,
            ComposedTarget::Ollama(request) => self.chat(request).await,
            ComposedTarget::ToolOnly => Err(ProviderError::ToolOnlyTarget),
        }
    }
}

/// `output.message.content[*].text`, joined
fn bedrock_text(raw: &Value) -> Result<String, ProviderError> {
    let blocks = raw
        .pointer("/output/message/content")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::InvalidResponse("missing output.message.content".to_string()))?;
    Ok(blocks
        .iter()
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(""))
}

fn ollama_text(raw: &Value) -> Result<String, ProviderError> {
    raw.pointer("/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::InvalidResponse("missing message.content".to_string()))
}

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Provider-ready request produced from a Prompt node's inbound subgraph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedMessage {
    pub prompt_id: NodeId,
    /// Joined Background / Context / OutputIndicator text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Messages with their canonical roles, before provider remapping
    pub messages: Vec<ChatMessage>,
    #[serde(flatten)]
    pub target: ComposedTarget,
}

impl ComposedMessage {
    pub fn target_name(&self) -> &'static str {
        self.target.name()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "target", content = "payload", rename_all = "kebab-case")]
pub enum ComposedTarget {
    Bedrock(BedrockRequest),
    Ollama(OllamaRequest),
    /// No model reachable from the prompt; the graph only drives tools
    ToolOnly,
}

impl ComposedTarget {
    pub fn name(&self) -> &'static str {
        match self {
            ComposedTarget::Bedrock(_) => "bedrock",
            ComposedTarget::Ollama(_) => "ollama",
            ComposedTarget::ToolOnly => "tool-only",
        }
    }

    pub fn model_id(&self) -> Option<&str> {
        match self {
            ComposedTarget::Bedrock(req) => Some(&req.model_id),
            ComposedTarget::Ollama(req) => Some(&req.model),
            ComposedTarget::ToolOnly => None,
        }
    }
}

/// Bedrock Converse request body (plus the model id it is sent to)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockRequest {
    pub model_id: String,
    pub messages: Vec<BedrockMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<BedrockContent>,
    pub inference_config: BedrockInferenceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedrockMessage {
    pub role: Role,
    pub content: Vec<BedrockContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedrockContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockInferenceConfig {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

/// Ollama `/api/chat` request body (plus the server it is sent to)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaRequest {
    pub endpoint: String,
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    pub options: OllamaOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub num_predict: u32,
}

/// Reply from a provider call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderReply {
    pub text: String,
    pub raw: Value,
}

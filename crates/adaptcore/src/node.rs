use crate::message::Role;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type NodeId = String;

/// Recognized node kinds. Graphs may carry other kinds; those deserialize
/// into [`NodeConfig::Unknown`] and are passed through at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Background,
    Context,
    OutputIndicator,
    PromptText,
    Prompt,
    Model,
    ModelSet,
    Tool,
    ToolSet,
    Router,
    Memory,
    Entrypoint,
    Agent,
    SubAgent,
}

impl NodeKind {
    pub const ALL: [NodeKind; 14] = [
        NodeKind::Background,
        NodeKind::Context,
        NodeKind::OutputIndicator,
        NodeKind::PromptText,
        NodeKind::Prompt,
        NodeKind::Model,
        NodeKind::ModelSet,
        NodeKind::Tool,
        NodeKind::ToolSet,
        NodeKind::Router,
        NodeKind::Memory,
        NodeKind::Entrypoint,
        NodeKind::Agent,
        NodeKind::SubAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Background => "background",
            NodeKind::Context => "context",
            NodeKind::OutputIndicator => "outputIndicator",
            NodeKind::PromptText => "promptText",
            NodeKind::Prompt => "prompt",
            NodeKind::Model => "model",
            NodeKind::ModelSet => "modelSet",
            NodeKind::Tool => "tool",
            NodeKind::ToolSet => "toolSet",
            NodeKind::Router => "router",
            NodeKind::Memory => "memory",
            NodeKind::Entrypoint => "entrypoint",
            NodeKind::Agent => "agent",
            NodeKind::SubAgent => "subAgent",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canvas position, also used to order context and prompt text deterministically
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// A graph node. On the wire the kind and its config are two sibling fields;
/// in memory they are one typed [`NodeConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    pub label: String,
    pub notes: Option<String>,
    pub config: NodeConfig,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, config: NodeConfig) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            label: String::new(),
            notes: None,
            config,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// `None` for kinds outside the recognized set
    pub fn kind(&self) -> Option<NodeKind> {
        self.config.kind()
    }

    pub fn kind_name(&self) -> &str {
        match &self.config {
            NodeConfig::Unknown { kind, .. } => kind,
            other => other.kind().map(|k| k.as_str()).unwrap_or("unknown"),
        }
    }

    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind() == Some(kind)
    }
}

/// Kind-specific node configuration
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    Background(TextBlock),
    Context(TextBlock),
    OutputIndicator(TextBlock),
    PromptText(PromptTextConfig),
    Prompt(Map<String, Value>),
    Model(ModelConfig),
    ModelSet(ModelSetConfig),
    Tool(ToolConfig),
    ToolSet(ToolSetConfig),
    Router(RouterConfig),
    Memory(MemoryConfig),
    Entrypoint(Map<String, Value>),
    Agent(Map<String, Value>),
    SubAgent(Map<String, Value>),
    Unknown { kind: String, config: Value },
}

impl NodeConfig {
    pub fn kind(&self) -> Option<NodeKind> {
        Some(match self {
            NodeConfig::Background(_) => NodeKind::Background,
            NodeConfig::Context(_) => NodeKind::Context,
            NodeConfig::OutputIndicator(_) => NodeKind::OutputIndicator,
            NodeConfig::PromptText(_) => NodeKind::PromptText,
            NodeConfig::Prompt(_) => NodeKind::Prompt,
            NodeConfig::Model(_) => NodeKind::Model,
            NodeConfig::ModelSet(_) => NodeKind::ModelSet,
            NodeConfig::Tool(_) => NodeKind::Tool,
            NodeConfig::ToolSet(_) => NodeKind::ToolSet,
            NodeConfig::Router(_) => NodeKind::Router,
            NodeConfig::Memory(_) => NodeKind::Memory,
            NodeConfig::Entrypoint(_) => NodeKind::Entrypoint,
            NodeConfig::Agent(_) => NodeKind::Agent,
            NodeConfig::SubAgent(_) => NodeKind::SubAgent,
            NodeConfig::Unknown { .. } => return None,
        })
    }

    /// Parse the config for `kind`. A missing config behaves like `{}`.
    pub fn from_parts(kind: &str, config: Value) -> Result<Self, serde_json::Error> {
        let config = if config.is_null() {
            Value::Object(Map::new())
        } else {
            config
        };
        let Some(known) = NodeKind::parse(kind) else {
            return Ok(NodeConfig::Unknown {
                kind: kind.to_string(),
                config,
            });
        };
        Ok(match known {
            NodeKind::Background => NodeConfig::Background(serde_json::from_value(config)?),
            NodeKind::Context => NodeConfig::Context(serde_json::from_value(config)?),
            NodeKind::OutputIndicator => {
                NodeConfig::OutputIndicator(serde_json::from_value(config)?)
            }
            NodeKind::PromptText => NodeConfig::PromptText(serde_json::from_value(config)?),
            NodeKind::Prompt => NodeConfig::Prompt(serde_json::from_value(config)?),
            NodeKind::Model => NodeConfig::Model(serde_json::from_value(config)?),
            NodeKind::ModelSet => NodeConfig::ModelSet(serde_json::from_value(config)?),
            NodeKind::Tool => NodeConfig::Tool(serde_json::from_value(config)?),
            NodeKind::ToolSet => NodeConfig::ToolSet(serde_json::from_value(config)?),
            NodeKind::Router => NodeConfig::Router(serde_json::from_value(config)?),
            NodeKind::Memory => NodeConfig::Memory(serde_json::from_value(config)?),
            NodeKind::Entrypoint => NodeConfig::Entrypoint(serde_json::from_value(config)?),
            NodeKind::Agent => NodeConfig::Agent(serde_json::from_value(config)?),
            NodeKind::SubAgent => NodeConfig::SubAgent(serde_json::from_value(config)?),
        })
    }

    /// Config as plain JSON, as it appears on the wire
    pub fn to_json(&self) -> Value {
        let value = match self {
            NodeConfig::Background(c) | NodeConfig::Context(c) | NodeConfig::OutputIndicator(c) => {
                serde_json::to_value(c)
            }
            NodeConfig::PromptText(c) => serde_json::to_value(c),
            NodeConfig::Prompt(m)
            | NodeConfig::Entrypoint(m)
            | NodeConfig::Agent(m)
            | NodeConfig::SubAgent(m) => Ok(Value::Object(m.clone())),
            NodeConfig::Model(c) => serde_json::to_value(c),
            NodeConfig::ModelSet(c) => serde_json::to_value(c),
            NodeConfig::Tool(c) => serde_json::to_value(c),
            NodeConfig::ToolSet(c) => serde_json::to_value(c),
            NodeConfig::Router(c) => serde_json::to_value(c),
            NodeConfig::Memory(c) => serde_json::to_value(c),
            NodeConfig::Unknown { config, .. } => Ok(config.clone()),
        };
        value.unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize)]
struct RawNode {
    id: NodeId,
    kind: String,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    config: Value,
    #[serde(default)]
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl TryFrom<RawNode> for Node {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let config = NodeConfig::from_parts(&raw.kind, raw.config)
            .map_err(|e| format!("invalid config for {} node '{}': {}", raw.kind, raw.id, e))?;
        Ok(Node {
            id: raw.id,
            position: raw.position,
            label: raw.label,
            notes: raw.notes,
            config,
        })
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        RawNode {
            kind: node.kind_name().to_string(),
            config: node.config.to_json(),
            id: node.id,
            position: node.position,
            label: node.label,
            notes: node.notes,
        }
    }
}

/// Background, Context and OutputIndicator nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptTextConfig {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub role: Role,
    /// Static template values for `{{var}}` placeholders
    #[serde(default)]
    pub inputs: Map<String, Value>,
}

impl PromptTextConfig {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Bedrock,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Bedrock => "bedrock",
            Provider::Ollama => "ollama",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model id that asks the executor to pick a model at run time
pub const AUTO_MODEL_ID: &str = "auto";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ModelConfig {
    pub fn new(provider: Provider, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            ..Self::default()
        }
    }

    pub fn is_auto(&self) -> bool {
        self.model_id == AUTO_MODEL_ID
    }
}

fn default_strategy() -> String {
    "single".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSetConfig {
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<NodeId>,
}

impl Default for ModelSetConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            primary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ToolConfig {
    #[serde(rename = "internal")]
    Internal {
        name: String,
        #[serde(default)]
        params: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        batch: Vec<Map<String, Value>>,
    },
    #[serde(rename = "mcp")]
    Mcp {
        server: String,
        tool: String,
        #[serde(default)]
        params: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        batch: Vec<Map<String, Value>>,
    },
    #[serde(rename = "openapi")]
    OpenApi {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
        #[serde(default)]
        params: Map<String, Value>,
    },
}

impl ToolConfig {
    pub fn internal(name: impl Into<String>) -> Self {
        ToolConfig::Internal {
            name: name.into(),
            params: Map::new(),
            batch: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ToolConfig::Internal { .. } => "internal",
            ToolConfig::Mcp { .. } => "mcp",
            ToolConfig::OpenApi { .. } => "openapi",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallPolicy {
    #[default]
    ToolFirst,
    ModelFirst,
    Interleave,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSetConfig {
    #[serde(default)]
    pub allow_list: Vec<NodeId>,
    #[serde(default)]
    pub call_policy: CallPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    #[default]
    If,
    Retry,
    Fallback,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterCondition {
    #[serde(rename = "type", default)]
    pub condition_type: ConditionType,
    #[serde(default)]
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then_node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub else_node: Option<NodeId>,
}

impl RouterCondition {
    pub fn when(expression: impl Into<String>, then_node: impl Into<NodeId>) -> Self {
        Self {
            condition_type: ConditionType::If,
            expression: expression.into(),
            then_node: Some(then_node.into()),
            else_node: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub conditions: Vec<RouterCondition>,
}

fn default_top_k() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryConfig {
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            index: None,
            top_k: default_top_k(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_kind_and_config_into_typed_variant() {
        let node: Node = serde_json::from_value(json!({
            "id": "m1",
            "kind": "model",
            "position": {"x": 1.0, "y": 2.0},
            "config": {"provider": "ollama", "modelId": "llama3", "maxTokens": 128},
            "label": "Local"
        }))
        .unwrap();

        assert_eq!(node.kind(), Some(NodeKind::Model));
        match node.config {
            NodeConfig::Model(cfg) => {
                assert_eq!(cfg.provider, Provider::Ollama);
                assert_eq!(cfg.model_id, "llama3");
                assert_eq!(cfg.max_tokens, Some(128));
            }
            other => panic!("unexpected config {:?}", other),
        }
    }

    #[test]
    fn unrecognized_kind_is_kept_as_unknown() {
        let node: Node = serde_json::from_value(json!({
            "id": "x",
            "kind": "hologram",
            "config": {"beam": true}
        }))
        .unwrap();

        assert_eq!(node.kind(), None);
        assert_eq!(node.kind_name(), "hologram");
    }

    #[test]
    fn tool_config_is_tagged_by_kind() {
        let node: Node = serde_json::from_value(json!({
            "id": "t",
            "kind": "tool",
            "config": {"kind": "mcp", "server": "docs", "tool": "search"}
        }))
        .unwrap();

        assert!(matches!(
            node.config,
            NodeConfig::Tool(ToolConfig::Mcp { ref server, .. }) if server == "docs"
        ));
    }

    #[test]
    fn round_trips_wire_shape() {
        let node = Node::new("r", NodeConfig::Router(RouterConfig {
            conditions: vec![RouterCondition::when("success", "ok")],
        }));
        let wire = serde_json::to_value(&node).unwrap();

        assert_eq!(wire["kind"], "router");
        assert_eq!(wire["config"]["conditions"][0]["thenNode"], "ok");
        assert_eq!(wire["config"]["conditions"][0]["type"], "if");
    }
}

//! Turns a Prompt node and its inbound subgraph into a provider-ready message.
//!
//! Background, Context and OutputIndicator nodes form the system preamble.
//! PromptText nodes become individual messages after `{{var}}` rendering.
//! The model comes from the ModelSet or Model node the Prompt points at.
//! Without one the message is tool-only.

use adaptcore::{
    BedrockContent, BedrockInferenceConfig, BedrockMessage, BedrockRequest, ChatMessage,
    ComposedMessage, ComposedTarget, CompositionError, Edge, ModelConfig, Node, NodeConfig,
    NodeId, NodeKind, OllamaMessage, OllamaOptions, OllamaRequest, Provider, Role,
};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").unwrap());

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Prompt to compose; ignored unless it names a Prompt node
    pub prompt_id: Option<NodeId>,
    /// Template values that override PromptText `inputs`
    pub runtime_inputs: Map<String, Value>,
}

/// Inference defaults applied when a Model node leaves them unset
#[derive(Debug, Clone)]
pub struct InferenceDefaults {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub ollama_endpoint: String,
}

impl Default for InferenceDefaults {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 2048,
            ollama_endpoint: "http://localhost:11434".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Compositor {
    defaults: InferenceDefaults,
}

/// Composes with default inference settings
pub fn compose(
    nodes: &[Node],
    edges: &[Edge],
    options: &ComposeOptions,
) -> Result<ComposedMessage, CompositionError> {
    Compositor::default().compose(nodes, edges, options)
}

impl Compositor {
    pub fn new(defaults: InferenceDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &InferenceDefaults {
        &self.defaults
    }

    pub fn compose(
        &self,
        nodes: &[Node],
        edges: &[Edge],
        options: &ComposeOptions,
    ) -> Result<ComposedMessage, CompositionError> {
        let graph = GraphView::new(nodes, edges)?;
        let prompt = graph.target_prompt(options.prompt_id.as_deref())?;

        let inbound = graph.sources_of(&prompt.id);
        let system = preamble(&inbound);
        let messages = prompt_messages(prompt, &inbound, &options.runtime_inputs);

        let target = match graph.resolve_model(prompt)? {
            Some(model) => self.target_for(model, system.as_deref(), &messages),
            None => ComposedTarget::ToolOnly,
        };

        tracing::debug!(
            prompt = %prompt.id,
            target = target.name(),
            messages = messages.len(),
            "composed message"
        );

        Ok(ComposedMessage {
            prompt_id: prompt.id.clone(),
            system,
            messages,
            target,
        })
    }

    /// Provider payload for `model`, with role remapping and inference defaults applied
    pub fn target_for(
        &self,
        model: &ModelConfig,
        system: Option<&str>,
        messages: &[ChatMessage],
    ) -> ComposedTarget {
        let temperature = model.temperature.unwrap_or(self.defaults.temperature);
        let top_p = model.top_p.unwrap_or(self.defaults.top_p);
        let max_tokens = model.max_tokens.unwrap_or(self.defaults.max_tokens);

        match model.provider {
            Provider::Bedrock => ComposedTarget::Bedrock(BedrockRequest {
                model_id: model.model_id.clone(),
                messages: messages.iter().map(bedrock_message).collect(),
                system: system
                    .map(|text| vec![BedrockContent { text: text.to_string() }])
                    .unwrap_or_default(),
                inference_config: BedrockInferenceConfig {
                    max_tokens,
                    temperature,
                    top_p,
                },
            }),
            Provider::Ollama => {
                let leading = system.map(|text| OllamaMessage {
                    role: Role::System,
                    content: text.to_string(),
                });
                ComposedTarget::Ollama(OllamaRequest {
                    endpoint: model
                        .endpoint
                        .clone()
                        .unwrap_or_else(|| self.defaults.ollama_endpoint.clone()),
                    model: model.model_id.clone(),
                    messages: leading
                        .into_iter()
                        .chain(messages.iter().map(|m| OllamaMessage {
                            role: m.role,
                            content: m.text.clone(),
                        }))
                        .collect(),
                    stream: false,
                    options: OllamaOptions {
                        temperature,
                        top_p,
                        num_predict: max_tokens,
                    },
                })
            }
        }
    }
}

/// Bedrock has no system role inside `messages`
fn bedrock_message(message: &ChatMessage) -> BedrockMessage {
    let (role, text) = match message.role {
        Role::System => (Role::User, format!("[System]: {}", message.text)),
        role => (role, message.text.clone()),
    };
    BedrockMessage {
        role,
        content: vec![BedrockContent { text }],
    }
}

struct GraphView<'a> {
    nodes: &'a [Node],
    edges: &'a [Edge],
    by_id: HashMap<&'a str, &'a Node>,
}

impl<'a> GraphView<'a> {
    fn new(nodes: &'a [Node], edges: &'a [Edge]) -> Result<Self, CompositionError> {
        let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        for edge in edges {
            for end in [&edge.source, &edge.target] {
                if !by_id.contains_key(end.as_str()) {
                    return Err(CompositionError::NodeNotFound(end.clone()));
                }
            }
        }
        Ok(Self { nodes, edges, by_id })
    }

    fn targets_of(&self, id: &str) -> Vec<&'a Node> {
        self.edges
            .iter()
            .filter(|e| e.source == id)
            .filter_map(|e| self.by_id.get(e.target.as_str()).copied())
            .collect()
    }

    fn sources_of(&self, id: &str) -> Vec<&'a Node> {
        self.edges
            .iter()
            .filter(|e| e.target == id)
            .filter_map(|e| self.by_id.get(e.source.as_str()).copied())
            .collect()
    }

    fn target_prompt(&self, requested: Option<&str>) -> Result<&'a Node, CompositionError> {
        if let Some(node) = requested
            .and_then(|id| self.by_id.get(id).copied())
            .filter(|n| n.is(NodeKind::Prompt))
        {
            return Ok(node);
        }

        let mut prompts = self.nodes.iter().filter(|n| n.is(NodeKind::Prompt));
        let first = prompts.clone().next().ok_or(CompositionError::NoPromptNode)?;
        Ok(prompts
            .find(|p| {
                self.targets_of(&p.id)
                    .iter()
                    .any(|t| t.is(NodeKind::Model) || t.is(NodeKind::ModelSet))
            })
            .unwrap_or(first))
    }

    /// ModelSet wins over a direct Model edge
    fn resolve_model(&self, prompt: &Node) -> Result<Option<&'a ModelConfig>, CompositionError> {
        let targets = self.targets_of(&prompt.id);

        if let Some(set) = targets.iter().find(|n| n.is(NodeKind::ModelSet)) {
            let NodeConfig::ModelSet(config) = &set.config else {
                return Ok(None);
            };
            if config.strategy != "single" {
                return Err(CompositionError::UnsupportedStrategy(config.strategy.clone()));
            }
            let primary = config
                .primary
                .as_deref()
                .and_then(|id| self.by_id.get(id).copied())
                .and_then(model_config);
            let first_inbound = || self.sources_of(&set.id).into_iter().find_map(model_config);
            return Ok(primary.or_else(first_inbound));
        }

        Ok(targets.into_iter().find_map(model_config))
    }
}

fn model_config(node: &Node) -> Option<&ModelConfig> {
    match &node.config {
        NodeConfig::Model(config) => Some(config),
        _ => None,
    }
}

/// Ascending y, then ascending x
fn by_position<'a>(nodes: &[&'a Node], kind: NodeKind) -> Vec<&'a Node> {
    let mut selected: Vec<&Node> = nodes.iter().copied().filter(|n| n.is(kind)).collect();
    selected.sort_by(|a, b| {
        a.position
            .y
            .total_cmp(&b.position.y)
            .then(a.position.x.total_cmp(&b.position.x))
    });
    selected
}

fn preamble(inbound: &[&Node]) -> Option<String> {
    let groups: Vec<String> = [NodeKind::Background, NodeKind::Context, NodeKind::OutputIndicator]
        .into_iter()
        .map(|kind| {
            by_position(inbound, kind)
                .into_iter()
                .filter_map(|n| match &n.config {
                    NodeConfig::Background(block)
                    | NodeConfig::Context(block)
                    | NodeConfig::OutputIndicator(block) => Some(block.text.trim()),
                    _ => None,
                })
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|group| !group.is_empty())
        .collect();

    if groups.is_empty() {
        None
    } else {
        Some(groups.join("\n\n"))
    }
}

fn prompt_messages(prompt: &Node, inbound: &[&Node], runtime_inputs: &Map<String, Value>) -> Vec<ChatMessage> {
    let messages: Vec<ChatMessage> = by_position(inbound, NodeKind::PromptText)
        .into_iter()
        .filter_map(|n| match &n.config {
            NodeConfig::PromptText(config) => {
                let mut values = config.inputs.clone();
                values.extend(runtime_inputs.iter().map(|(k, v)| (k.clone(), v.clone())));
                Some(ChatMessage::new(config.role, render_template(&config.text, &values)))
            }
            _ => None,
        })
        .collect();

    if !messages.is_empty() {
        return messages;
    }

    let label = prompt.label.trim();
    let text = if label.is_empty() { DEFAULT_SYSTEM_PROMPT } else { label };
    vec![ChatMessage::system(text)]
}

/// Replace `{{name}}` placeholders. Unknown names are left untouched.
pub fn render_template(text: &str, values: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| match values.get(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

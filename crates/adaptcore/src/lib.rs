//! Core abstractions for the adaptive workflow engine
//!
//! Graph data model, composed provider messages, error types, execution
//! events and the collaborator traits the runtime is wired against.

pub mod collaborators;
mod error;
pub mod events;
mod message;
mod node;
mod workflow;

pub use collaborators::{
    MessageExecutor, RateDecision, RateLimiter, TierResolver, ToolCall, ToolInvoker, UserTier,
    WorkflowStore,
};
pub use error::{CompositionError, FlowError, ProviderError, ToolError, WorkflowError};
pub use events::*;
pub use message::{
    BedrockContent, BedrockInferenceConfig, BedrockMessage, BedrockRequest, ChatMessage,
    ComposedMessage, ComposedTarget, OllamaMessage, OllamaOptions, OllamaRequest, ProviderReply,
    Role,
};
pub use node::{
    CallPolicy, ConditionType, MemoryConfig, ModelConfig, ModelSetConfig, Node, NodeConfig,
    NodeId, NodeKind, Position, PromptTextConfig, Provider, RouterCondition, RouterConfig,
    TextBlock, ToolConfig, ToolSetConfig, AUTO_MODEL_ID,
};
pub use workflow::{Edge, Workflow, WorkflowId};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;

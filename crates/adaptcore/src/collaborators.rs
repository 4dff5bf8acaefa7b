//! Narrow interfaces to the systems around the engine.
//!
//! Persistence, tool catalogs, provider credentials, user tiers and rate
//! limits are owned elsewhere; the engine only talks to them through these
//! traits.

use crate::{ComposedMessage, ProviderError, ProviderReply, ToolError, Workflow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Read-only graph fetch
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get_workflow(&self, id: &str) -> Option<Workflow>;
}

/// A single tool invocation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ToolCall {
    Internal {
        name: String,
        params: Map<String, Value>,
    },
    Mcp {
        server: String,
        tool: String,
        params: Map<String, Value>,
    },
    OpenApi {
        operation: Option<String>,
        params: Map<String, Value>,
    },
}

impl ToolCall {
    pub fn type_name(&self) -> &'static str {
        match self {
            ToolCall::Internal { .. } => "internal",
            ToolCall::Mcp { .. } => "mcp",
            ToolCall::OpenApi { .. } => "openapi",
        }
    }
}

/// Generic tool invocation, used for MCP tools and internal tools that are
/// not registered locally
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke_tool(&self, call: &ToolCall) -> Result<Value, ToolError>;
}

/// Single entry point to the underlying provider call
#[async_trait]
pub trait MessageExecutor: Send + Sync {
    /// Must reject `tool-only` messages and fail on missing credentials
    /// before any network I/O.
    async fn execute_composed(&self, message: &ComposedMessage)
        -> Result<ProviderReply, ProviderError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserTier {
    #[default]
    Freemium,
    Pro,
    Enterprise,
}

impl UserTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserTier::Freemium => "freemium",
            UserTier::Pro => "pro",
            UserTier::Enterprise => "enterprise",
        }
    }
}

#[async_trait]
pub trait TierResolver: Send + Sync {
    async fn resolve_tier(&self, user_id: &str) -> UserTier;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum RateDecision {
    Allowed,
    Rejected {
        reason: String,
        retry_after_secs: u64,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, user_id: &str, tier: UserTier, model_key: &str) -> RateDecision;
}

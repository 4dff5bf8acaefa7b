//! Workflow execution runtime
//!
//! Composes provider messages from prompt graphs, runs graphs through the
//! prompt+model, router or DAG strategy, dispatches individual nodes and
//! hosts the unified single-call agent path.

mod compositor;
mod config;
mod dag;
mod decider;
mod dispatch;
mod executor;
mod registry;
pub mod router;
mod runtime;
mod unified;

pub use compositor::{
    compose, render_template, ComposeOptions, Compositor, InferenceDefaults,
    DEFAULT_SYSTEM_PROMPT,
};
pub use config::{
    expand_env_vars, ConfigError, EngineConfig, McpConfig, ProvidersConfig, RateLimitsConfig,
    TiersConfig,
};
pub use dag::validate_dag;
pub use decider::{CatalogDecider, ModelDecider};
pub use dispatch::{NodeDispatcher, ResolvedResults};
pub use executor::{
    ExecuteRequest, ExecutionLogEntry, ExecutionResponse, ExecutionStrategy, WorkflowExecutor,
};
pub use registry::{InternalTool, ParamDefinition, ToolListing, ToolMetadata, ToolRegistry};
pub use runtime::{FlowRuntime, RuntimeConfig};
pub use unified::{UnifiedAgent, UnifiedResponse, UNIFIED_PROMPT_ID};

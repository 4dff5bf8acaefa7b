use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Model selection failed: {0}")]
    Selection(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Invalid entry point: expected exactly one node without incoming edges, found {found}")]
    InvalidEntryPoint { found: usize },

    #[error("Cyclic dependency detected")]
    CyclicDependency,

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Workflow has no terminal node")]
    NoTerminalNode,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositionError {
    #[error("Graph has no prompt node")]
    NoPromptNode,

    #[error("Unsupported model set strategy '{0}', only 'single' is supported")]
    UnsupportedStrategy(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Composed message has no model target (tool-only graph)")]
    ToolOnlyTarget,

    #[error("Missing credentials for {provider}: set {variable}")]
    MissingCredentials { provider: String, variable: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unknown MCP server: {0}")]
    UnknownServer(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),
}

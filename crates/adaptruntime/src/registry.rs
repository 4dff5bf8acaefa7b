use adaptcore::ToolError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A tool that runs in-process, addressed by name from `internal` tool nodes
#[async_trait]
pub trait InternalTool: Send + Sync {
    fn name(&self) -> &str;

    /// Optional: description and parameter schema shown by `adapt tools`
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::default()
    }

    async fn call(&self, params: Map<String, Value>) -> Result<Value, ToolError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolMetadata {
    pub description: String,
    pub category: String,
    pub params: Vec<ParamDefinition>,
}

impl Default for ToolMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            params: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamDefinition {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ParamDefinition {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, description)
        }
    }
}

/// Registered tool name with its metadata, as listed by the CLI and server
#[derive(Debug, Clone, Serialize)]
pub struct ToolListing {
    pub name: String,
    #[serde(flatten)]
    pub metadata: ToolMetadata,
}

/// Registry of in-process tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn InternalTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn InternalTool>) {
        let name = tool.name().to_string();
        tracing::info!("Registering internal tool: {}", name);
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn InternalTool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names, sorted
    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get_metadata(&self, name: &str) -> Option<ToolMetadata> {
        self.tools.get(name).map(|t| t.metadata())
    }

    pub fn listings(&self) -> Vec<ToolListing> {
        self.list_tools()
            .into_iter()
            .filter_map(|name| {
                let metadata = self.get_metadata(&name)?;
                Some(ToolListing { name, metadata })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

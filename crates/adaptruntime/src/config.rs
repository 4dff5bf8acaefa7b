use crate::runtime::RuntimeConfig;
use adaptcore::UserTier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level engine configuration, read from `adapt.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub tiers: TiersConfig,
    #[serde(default)]
    pub rate_limits: RateLimitsConfig,
    /// Directory of `*.json` graphs served by the file-backed workflow store
    #[serde(default)]
    pub workflows_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_ollama_endpoint")]
    pub ollama_endpoint: String,
    #[serde(default = "default_bedrock_region")]
    pub bedrock_region: String,
    /// Environment variable holding the Bedrock API key
    #[serde(default = "default_bedrock_token_env")]
    pub bedrock_token_env: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            ollama_endpoint: default_ollama_endpoint(),
            bedrock_region: default_bedrock_region(),
            bedrock_token_env: default_bedrock_token_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_bedrock_region() -> String {
    "us-east-1".to_string()
}

fn default_bedrock_token_env() -> String {
    "AWS_BEARER_TOKEN_BEDROCK".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    /// Server name to JSON-RPC endpoint URL
    #[serde(default)]
    pub servers: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TiersConfig {
    #[serde(default)]
    pub default: UserTier,
    #[serde(default)]
    pub users: HashMap<String, UserTier>,
}

/// Requests per minute for paid model calls, per tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitsConfig {
    #[serde(default = "default_freemium_rpm")]
    pub freemium: u32,
    #[serde(default = "default_pro_rpm")]
    pub pro: u32,
    #[serde(default = "default_enterprise_rpm")]
    pub enterprise: u32,
}

impl RateLimitsConfig {
    pub fn per_minute(&self, tier: UserTier) -> u32 {
        match tier {
            UserTier::Freemium => self.freemium,
            UserTier::Pro => self.pro,
            UserTier::Enterprise => self.enterprise,
        }
    }
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            freemium: default_freemium_rpm(),
            pro: default_pro_rpm(),
            enterprise: default_enterprise_rpm(),
        }
    }
}

fn default_freemium_rpm() -> u32 {
    10
}

fn default_pro_rpm() -> u32 {
    60
}

fn default_enterprise_rpm() -> u32 {
    600
}

impl EngineConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::NotFound(path.display().to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }
}

/// Expand `${ENV_VAR}` patterns; unset variables are left as written.
pub fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config.runtime.max_router_iterations, 100);
        assert_eq!(config.runtime.tool_batch_size, 5);
        assert_eq!(config.providers.ollama_endpoint, "http://localhost:11434");
        assert_eq!(config.rate_limits.per_minute(UserTier::Pro), 60);
        assert!(config.workflows_dir.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            workflows_dir = "graphs"

            [runtime]
            max_router_iterations = 20

            [providers]
            bedrock_region = "eu-west-1"

            [mcp.servers]
            docs = "http://localhost:9000/rpc"

            [tiers]
            default = "pro"
            users = { alice = "enterprise" }
            "#,
        )
        .unwrap();

        assert_eq!(config.runtime.max_router_iterations, 20);
        assert_eq!(config.runtime.tool_batch_size, 5);
        assert_eq!(config.providers.bedrock_region, "eu-west-1");
        assert_eq!(config.mcp.servers["docs"], "http://localhost:9000/rpc");
        assert_eq!(config.tiers.default, UserTier::Pro);
        assert_eq!(config.tiers.users["alice"], UserTier::Enterprise);
        assert_eq!(config.workflows_dir, Some(PathBuf::from("graphs")));
    }

    #[test]
    fn expands_set_variables_and_keeps_missing_ones() {
        std::env::set_var("ADAPT_TEST_ENDPOINT", "http://ollama:11434");
        let result = expand_env_vars("a = \"${ADAPT_TEST_ENDPOINT}\" b = \"${ADAPT_UNSET_VAR}\"");
        assert_eq!(result, "a = \"http://ollama:11434\" b = \"${ADAPT_UNSET_VAR}\"");
        std::env::remove_var("ADAPT_TEST_ENDPOINT");
    }
}

//! Configuration management for browser-pilot.
//!
//! Configuration can be set via environment variables:
//! - `LLM_PROVIDER` - Optional. `openai`, `anthropic` or `local`. Defaults to `openai`.
//! - `OPENAI_API_KEY` - API key for OpenAI (also the fallback for Anthropic).
//! - `ANTHROPIC_API_KEY` - Optional. API key for Anthropic.
//! - `LLM_MODEL` - Optional. Model identifier. Defaults depend on the provider.
//! - `LLM_BASE_URL` - Optional. Base URL of the provider API.
//! - `LLM_TIMEOUT_SECS` - Optional. HTTP timeout for LLM calls. Defaults to `60`.
//! - `MAX_TOOL_ITERATIONS` - Optional. Tool rounds per message. Defaults to `20`.
//! - `TOOL_RESULT_LIMIT` - Optional. Characters of tool output fed back in single-turn tasks. Defaults to `2000`.
//! - `COMMAND_TIMEOUT_SECS` - Optional. Upper bound for one agent command. Defaults to `210`.
//! - `SERVERS_CONFIG` - Optional. MCP servers file. Defaults to `servers_config.json`.
//! - `TASKS_PATH` - Optional. Task storage file. Defaults to `tasks.json`.
//! - `BAD_REQUEST_DUMP` - Optional. Where to dump payloads rejected with 400. `off` disables. Defaults to `bad_request.json`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `7861`.
//!
//! When no API key is present in the environment, the `llmApiKey` field of
//! the servers file is used instead.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::mcp::McpServerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Which LLM backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// OpenAI chat completions API
    OpenAi,
    /// Anthropic messages API
    Anthropic,
    /// Locally hosted model behind an OpenAI-compatible endpoint
    Local,
}

impl LlmProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-4",
            LlmProvider::Anthropic => "claude-3-7-sonnet-20250219",
            LlmProvider::Local => "Qwen/Qwen2.5-7B-Instruct",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "https://api.openai.com/v1",
            LlmProvider::Anthropic => "https://api.anthropic.com",
            LlmProvider::Local => "http://127.0.0.1:8000/v1",
        }
    }

    /// Env var holding this provider's credential.
    pub fn key_env_var(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            _ => "OPENAI_API_KEY",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LlmProvider::Local)
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAi),
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            "local" | "qwen" => Ok(LlmProvider::Local),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// LLM connection settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,

    /// Credential sent to the provider (may be empty for local models)
    pub api_key: String,

    pub model: String,

    /// Base URL without trailing slash
    pub base_url: String,

    /// Timeout for a single HTTP request
    pub timeout: Duration,

    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl LlmConfig {
    pub fn for_provider(provider: LlmProvider, api_key: String) -> Self {
        Self {
            provider,
            api_key,
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            timeout: Duration::from_secs(60),
            max_tokens: 4096,
            temperature: 0.7,
            top_p: 1.0,
        }
    }
}

/// Bounds for the agent tool loop.
#[derive(Debug, Clone, Copy)]
pub struct AgentLimits {
    /// Maximum tool rounds before the loop gives up
    pub max_tool_iterations: usize,

    /// Characters of tool output fed back during single-turn tasks
    pub tool_result_limit: usize,
}

impl Default for AgentLimits {
    fn default() -> Self {
        Self {
            max_tool_iterations: 20,
            tool_result_limit: 2000,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,

    pub limits: AgentLimits,

    /// Path to the MCP servers file (`mcpServers` map)
    pub servers_config_path: PathBuf,

    /// Path to the JSON task storage
    pub tasks_path: PathBuf,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Upper bound for a single agent command
    pub command_timeout: Duration,

    /// Where to write payloads the provider rejected with 400
    pub bad_request_dump: Option<PathBuf>,
}

/// Contents of the servers file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServersFile {
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: BTreeMap<String, McpServerConfig>,

    #[serde(rename = "llmApiKey", default)]
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// The API key may still be empty afterwards; see [`Config::load_servers`]
    /// and [`Config::require_api_key`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match std::env::var("LLM_PROVIDER") {
            Ok(v) => v
                .parse()
                .map_err(|e| ConfigError::InvalidValue("LLM_PROVIDER".to_string(), e))?,
            Err(_) => LlmProvider::OpenAi,
        };

        let api_key = std::env::var(provider.key_env_var())
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .unwrap_or_default();

        let mut llm = LlmConfig::for_provider(provider, api_key);
        if let Ok(model) = std::env::var("LLM_MODEL") {
            llm.model = model;
        }
        if let Ok(base_url) = std::env::var("LLM_BASE_URL") {
            llm.base_url = base_url.trim_end_matches('/').to_string();
        }
        llm.timeout = Duration::from_secs(env_parse("LLM_TIMEOUT_SECS", 60u64)?);

        let limits = AgentLimits {
            max_tool_iterations: env_parse("MAX_TOOL_ITERATIONS", 20usize)?,
            tool_result_limit: env_parse("TOOL_RESULT_LIMIT", 2000usize)?,
        };

        let servers_config_path = std::env::var("SERVERS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("servers_config.json"));

        let tasks_path = std::env::var("TASKS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("tasks.json"));

        // On/off switches keep the default file; anything else names the file.
        let default_dump = PathBuf::from("bad_request.json");
        let bad_request_dump = match std::env::var("BAD_REQUEST_DUMP") {
            Ok(v) => match parse_bool(&v) {
                Ok(false) => None,
                Ok(true) => Some(default_dump),
                Err(_) => Some(PathBuf::from(v.trim())),
            },
            Err(_) => Some(default_dump),
        };

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_parse("PORT", 7861u16)?;
        let command_timeout = Duration::from_secs(env_parse("COMMAND_TIMEOUT_SECS", 210u64)?);

        Ok(Self {
            llm,
            limits,
            servers_config_path,
            tasks_path,
            host,
            port,
            command_timeout,
            bad_request_dump,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(llm: LlmConfig, workspace: &Path) -> Self {
        Self {
            llm,
            limits: AgentLimits::default(),
            servers_config_path: workspace.join("servers_config.json"),
            tasks_path: workspace.join("tasks.json"),
            host: "127.0.0.1".to_string(),
            port: 7861,
            command_timeout: Duration::from_secs(210),
            bad_request_dump: None,
        }
    }

    /// Read the servers file and fill in the API key from it when the
    /// environment did not provide one.
    pub fn load_servers(&mut self) -> Result<ServersFile, ConfigError> {
        let path = self.servers_config_path.clone();
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let servers: ServersFile =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;

        if self.llm.api_key.is_empty() {
            if let Some(key) = servers.llm_api_key.as_ref().filter(|k| !k.is_empty()) {
                tracing::debug!("Using llmApiKey from {}", self.servers_config_path.display());
                self.llm.api_key = key.clone();
            }
        }

        Ok(servers)
    }

    /// Fail if a remote provider has no credential.
    pub fn require_api_key(&self) -> Result<(), ConfigError> {
        if self.llm.provider.requires_api_key() && self.llm.api_key.is_empty() {
            return Err(ConfigError::MissingEnvVar(
                self.llm.provider.key_env_var().to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}

//! LLM provider abstraction.
//!
//! Agents talk to a [`LlmClient`]: a system prompt plus a plain
//! user/assistant conversation in, assistant text out. Tool calls are
//! carried in the text itself (see [`crate::tools::parse_tool_call`]), so
//! every backend only needs basic chat completion.

mod anthropic;
mod error;
mod http;
mod openai;
mod rate_limit;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{LlmConfig, LlmProvider};

pub use anthropic::AnthropicClient;
pub use error::LlmError;
pub use openai::OpenAiClient;
pub use rate_limit::{parse_reset_duration, RetryPolicy};

/// Role of a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Chat completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Produce the assistant reply for `messages` under `system`.
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// Return `messages` with a tool result appended as the next user turn.
    fn append_tool_response(&self, result: &str, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut out = messages.to_vec();
        out.push(ChatMessage::user(result));
        out
    }
}

/// Build the client for the configured provider.
///
/// Local models are served behind an OpenAI-compatible endpoint, so they
/// share the OpenAI client.
pub fn build_client(
    config: &LlmConfig,
    bad_request_dump: Option<std::path::PathBuf>,
) -> Result<Arc<dyn LlmClient>, LlmError> {
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::OpenAi | LlmProvider::Local => {
            Arc::new(OpenAiClient::new(config.clone())?.with_bad_request_dump(bad_request_dump))
        }
        LlmProvider::Anthropic => Arc::new(AnthropicClient::new(config.clone())?),
    };
    tracing::info!(
        provider = ?config.provider,
        model = %config.model,
        "LLM client ready"
    );
    Ok(client)
}

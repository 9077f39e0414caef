//! OpenAI chat completions client (also used for local OpenAI-compatible servers).

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::http::JsonPoster;
use super::{ChatMessage, LlmClient, LlmError, RetryPolicy};
use crate::config::LlmConfig;

pub struct OpenAiClient {
    config: LlmConfig,
    poster: JsonPoster,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let poster = JsonPoster::new(config.timeout)?;
        Ok(Self { config, poster })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.poster.set_retry_policy(retry);
        self
    }

    /// Write payloads rejected with 400 to `path` for inspection.
    pub fn with_bad_request_dump(mut self, path: Option<PathBuf>) -> Self {
        self.poster.set_bad_request_dump(path);
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let mut structured = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            structured.push(ChatMessage::system(system));
        }
        structured.extend_from_slice(messages);

        let payload = json!({
            "model": self.config.model,
            "messages": structured,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
        });

        let url = format!("{}/chat/completions", self.config.base_url);
        let api_key = self.config.api_key.as_str();
        let body = self
            .poster
            .post(
                |http| {
                    let request = http.post(&url);
                    if api_key.is_empty() {
                        request
                    } else {
                        request.bearer_auth(api_key)
                    }
                },
                &payload,
            )
            .await?;

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::InvalidResponse(format!("{}: {}", e, body)))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))
    }
}

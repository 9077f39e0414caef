//! Anthropic messages API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::JsonPoster;
use super::{ChatMessage, LlmClient, LlmError, RetryPolicy, Role};
use crate::config::LlmConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    config: LlmConfig,
    poster: JsonPoster,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let poster = JsonPoster::new(config.timeout)?;
        Ok(Self { config, poster })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.poster.set_retry_policy(retry);
        self
    }
}

/// Claude takes a single system prompt; system turns in the history are folded into it.
fn split_system<'a>(system: &str, messages: &'a [ChatMessage]) -> (Option<String>, Vec<&'a ChatMessage>) {
    let mut parts: Vec<&str> = Vec::new();
    if !system.is_empty() {
        parts.push(system);
    }
    let mut turns = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            Role::System => parts.push(&message.content),
            _ => turns.push(message),
        }
    }
    let system = (!parts.is_empty()).then(|| parts.join("\n\n"));
    (system, turns)
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let (system, turns) = split_system(system, messages);
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            system,
            messages: turns,
        };
        let payload = serde_json::to_value(&request)
            .map_err(|e| LlmError::InvalidResponse(format!("failed to encode request: {}", e)))?;

        let url = format!("{}/v1/messages", self.config.base_url);
        let api_key = self.config.api_key.as_str();
        let body = self
            .poster
            .post(
                |http| {
                    http.post(&url)
                        .header("x-api-key", api_key)
                        .header("anthropic-version", ANTHROPIC_VERSION)
                },
                &payload,
            )
            .await?;

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::InvalidResponse(format!("{}: {}", e, body)))?;
        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| LlmError::InvalidResponse("no text block in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::config::LlmProvider;

    #[test]
    fn system_turns_fold_into_prompt() {
        let history = vec![
            ChatMessage::user("open github"),
            ChatMessage::system("Tool execution result: ok"),
            ChatMessage::assistant("Navigated"),
        ];
        let (system, turns) = split_system("You are a browser agent.", &history);
        assert_eq!(
            system.as_deref(),
            Some("You are a browser agent.\n\nTool execution result: ok")
        );
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, Role::Assistant);
    }

    #[test]
    fn empty_system_is_omitted() {
        let history = vec![ChatMessage::user("hi")];
        let (system, _) = split_system("", &history);
        assert!(system.is_none());
    }

    #[tokio::test]
    async fn posts_versioned_request_and_reads_text_block() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/messages")
                    .header("x-api-key", "sk-ant")
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json_body_partial(r#"{"system": "be brief", "max_tokens": 4096}"#);
                then.status(200).json_body(json!({
                    "content": [{"type": "text", "text": "Navigated to github.com"}]
                }));
            })
            .await;

        let mut config = LlmConfig::for_provider(LlmProvider::Anthropic, "sk-ant".to_string());
        config.base_url = server.base_url();
        let client = AnthropicClient::new(config).expect("client");

        let reply = client
            .complete("be brief", &[ChatMessage::user("go to github")])
            .await
            .expect("completion");
        assert_eq!(reply, "Navigated to github.com");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limit_retries_then_gives_up() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(429).body("overloaded");
            })
            .await;

        let mut config = LlmConfig::for_provider(LlmProvider::Anthropic, "sk-ant".to_string());
        config.base_url = server.base_url();
        let client = AnthropicClient::new(config)
            .expect("client")
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                jitter_min: Duration::from_millis(1),
                jitter_max: Duration::from_millis(2),
            });

        let err = client
            .complete("", &[ChatMessage::user("hi")])
            .await
            .expect_err("should be rate limited");
        assert!(matches!(err, LlmError::RateLimited { attempts: 3 }));
        assert_eq!(mock.hits_async().await, 3);
    }
}

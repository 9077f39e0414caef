//! JSON POST with 429 retry, shared by the provider clients.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;

use super::rate_limit::{inspect_headers, RetryPolicy};
use super::LlmError;

pub(crate) struct JsonPoster {
    http: Client,
    retry: RetryPolicy,
    /// Reset hint remembered from the last successful response.
    reset_delay: Mutex<Option<Duration>>,
    bad_request_dump: Option<PathBuf>,
}

impl JsonPoster {
    pub fn new(timeout: Duration) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            retry: RetryPolicy::default(),
            reset_delay: Mutex::new(None),
            bad_request_dump: None,
        })
    }

    pub fn set_retry_policy(&mut self, retry: RetryPolicy) {
        self.retry = retry;
    }

    pub fn set_bad_request_dump(&mut self, path: Option<PathBuf>) {
        self.bad_request_dump = path;
    }

    /// POST `payload` and return the response body of the first successful attempt.
    ///
    /// `build` receives the HTTP client and must return a request with URL and
    /// headers set; the JSON body is attached here.
    pub async fn post<F>(&self, build: F, payload: &Value) -> Result<String, LlmError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let response = build(&self.http).json(payload).send().await?;
            let status = response.status();

            if status.is_success() {
                let hint = inspect_headers(response.headers());
                *self.reset_delay.lock().await = hint;
                if let Some(delay) = hint {
                    tracing::info!(
                        "Rate limit reset delay set to {:.1} seconds",
                        delay.as_secs_f64()
                    );
                }
                return Ok(response.text().await?);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let hint = inspect_headers(response.headers());
                if attempt >= self.retry.max_attempts {
                    tracing::error!("Rate limited (429) on final attempt {}", attempt);
                    return Err(LlmError::RateLimited { attempts: attempt });
                }
                let wait = match hint {
                    Some(delay) => delay,
                    None => match self.reset_delay.lock().await.take() {
                        Some(delay) => delay,
                        None => self.retry.jitter(),
                    },
                };
                tracing::warn!(
                    "Rate limited (429), waiting {:.1}s before retry...",
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::BAD_REQUEST {
                self.dump_payload(payload).await;
                tracing::error!("400 Bad Request: {}", body);
                return Err(LlmError::BadRequest { body });
            }

            tracing::error!(status = status.as_u16(), "LLM request failed: {}", body);
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }
    }

    async fn dump_payload(&self, payload: &Value) {
        let Some(path) = &self.bad_request_dump else {
            return;
        };
        let contents = match serde_json::to_string_pretty(payload) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to serialize rejected payload: {}", e);
                return;
            }
        };
        match tokio::fs::write(path, contents).await {
            Ok(()) => tracing::error!(
                "Check {} to inspect the rejected input messages",
                path.display()
            ),
            Err(e) => tracing::warn!("Failed to write {}: {}", path.display(), e),
        }
    }
}

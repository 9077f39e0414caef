use thiserror::Error;

/// Errors from LLM providers.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("400 Bad Request: {body}")]
    BadRequest { body: String },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

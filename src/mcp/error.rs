use std::time::Duration;

use thiserror::Error;

/// Errors from MCP server connections.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("invalid server config for {server}: {reason}")]
    InvalidConfig { server: String, reason: String },

    #[error("server {0} uses a transport that is not supported yet")]
    UnsupportedTransport(String),

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server {0} is not initialized")]
    NotInitialized(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("connection to server closed")]
    ConnectionClosed,

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

//! JSON-RPC 2.0 framing and the MCP message shapes we use.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tools::ToolSpec;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC "method not found".
pub const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcNotification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Anything the server may write to us.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// Classified incoming message.
#[derive(Debug)]
pub enum Incoming {
    Response {
        id: u64,
        outcome: Result<Value, RpcErrorObject>,
    },
    Request {
        id: Value,
        method: String,
    },
    Notification {
        method: String,
    },
    Invalid,
}

impl IncomingMessage {
    pub fn classify(self) -> Incoming {
        match (self.id, self.method) {
            (Some(id), Some(method)) => Incoming::Request { id, method },
            (None, Some(method)) => Incoming::Notification { method },
            (Some(id), None) => {
                let Some(id) = id.as_u64() else {
                    return Incoming::Invalid;
                };
                let outcome = match self.error {
                    Some(err) => Err(err),
                    None => Ok(self.result.unwrap_or(Value::Null)),
                };
                Incoming::Response { id, outcome }
            }
            (None, None) => Incoming::Invalid,
        }
    }
}

/// Response line for a request the server sent us.
pub fn response_line(id: &Value, outcome: Result<Value, RpcErrorObject>) -> Value {
    match outcome {
        Ok(result) => json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "result": result }),
        Err(error) => json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "error": error }),
    }
}

pub fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    #[serde(default)]
    pub protocol_version: String,
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Flatten the content blocks into text for the LLM.
    pub fn to_text(&self) -> String {
        let mut parts = Vec::new();
        for item in &self.content {
            let Some(obj) = item.as_object() else {
                continue;
            };
            match obj.get("type").and_then(|v| v.as_str()) {
                Some("image") => parts.push("[image]".to_string()),
                Some("resource") => {
                    let resource = obj.get("resource");
                    let text = resource
                        .and_then(|r| r.get("text"))
                        .or_else(|| resource.and_then(|r| r.get("uri")))
                        .and_then(|v| v.as_str());
                    if let Some(text) = text {
                        parts.push(text.to_string());
                    }
                }
                _ => {
                    if let Some(text) = obj.get("text").and_then(|v| v.as_str()) {
                        parts.push(text.to_string());
                    }
                }
            }
        }

        let body = if parts.is_empty() {
            serde_json::to_string(&self.content)
                .unwrap_or_else(|_| "[structured content]".to_string())
        } else {
            parts.join("\n")
        };

        if self.is_error {
            format!("Error: {}", body)
        } else {
            body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_messages() {
        let response: IncomingMessage =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 3, "result": {"ok": true}}))
                .unwrap();
        assert!(matches!(
            response.classify(),
            Incoming::Response { id: 3, outcome: Ok(_) }
        ));

        let error: IncomingMessage = serde_json::from_value(
            json!({"jsonrpc": "2.0", "id": 4, "error": {"code": -32000, "message": "boom"}}),
        )
        .unwrap();
        match error.classify() {
            Incoming::Response { id: 4, outcome: Err(e) } => assert_eq!(e.message, "boom"),
            other => panic!("unexpected: {:?}", other),
        }

        let ping: IncomingMessage =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": "s-1", "method": "ping"}))
                .unwrap();
        assert!(matches!(ping.classify(), Incoming::Request { ref method, .. } if method == "ping"));

        let note: IncomingMessage = serde_json::from_value(
            json!({"jsonrpc": "2.0", "method": "notifications/tools/list_changed"}),
        )
        .unwrap();
        assert!(matches!(note.classify(), Incoming::Notification { .. }));
    }

    #[test]
    fn call_result_text_and_image() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Navigated to https://github.com"},
                {"type": "image", "data": "aGk=", "mimeType": "image/png"},
                {"type": "text", "text": "- Page Title: GitHub"}
            ]
        }))
        .unwrap();
        assert_eq!(
            result.to_text(),
            "Navigated to https://github.com\n[image]\n- Page Title: GitHub"
        );
    }

    #[test]
    fn call_result_error_and_resource() {
        let result: CallToolResult = serde_json::from_value(json!({
            "isError": true,
            "content": [{"type": "resource", "resource": {"uri": "file:///tmp/trace.zip"}}]
        }))
        .unwrap();
        assert_eq!(result.to_text(), "Error: file:///tmp/trace.zip");
    }

    #[test]
    fn call_result_unknown_content_falls_back_to_json() {
        let result = CallToolResult {
            content: vec![json!(42)],
            is_error: false,
        };
        assert_eq!(result.to_text(), "[42]");
    }
}

//! Tool descriptions and text-encoded tool calls.
//!
//! Agents do not use provider-native function calling. Tools are described
//! to the model in the system prompt, and the model answers with a bare
//! JSON object when it wants one executed:
//!
//! ```text
//! {"tool": "browser_navigate", "arguments": {"url": "https://github.com"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A tool advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// JSON Schema of the arguments
    #[serde(rename = "inputSchema", default = "empty_schema")]
    pub input_schema: Value,
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Render the tool for the system prompt.
    pub fn format_for_llm(&self) -> String {
        let required: Vec<&str> = self
            .input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut args = Vec::new();
        if let Some(properties) = self.input_schema.get("properties").and_then(Value::as_object) {
            for (param, info) in properties {
                let description = info
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("No description");
                let mut line = format!("- {}: {}", param, description);
                if required.contains(&param.as_str()) {
                    line.push_str(" (required)");
                }
                args.push(line);
            }
        }

        format!(
            "\nTool: {}\nDescription: {}\nArguments:\n{}\n",
            self.name,
            self.description,
            args.join("\n")
        )
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub arguments: Value,
}

/// Parse a model reply as a tool call.
///
/// Returns `None` for anything that is not a JSON object carrying both
/// `tool` (a string) and `arguments`.
pub fn parse_tool_call(reply: &str) -> Option<ToolCall> {
    let body = strip_code_fence(reply.trim());
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    let tool = object.get("tool")?.as_str()?;
    let arguments = object.get("arguments")?.clone();
    Some(ToolCall {
        tool: tool.to_string(),
        arguments,
    })
}

/// Strip a single Markdown code fence around `text`, if present.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    match rest.find('\n') {
        Some(newline) => rest[newline + 1..].trim(),
        None => rest.trim(),
    }
}

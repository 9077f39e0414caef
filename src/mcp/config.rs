//! MCP server entries from the `mcpServers` map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::McpError;

/// One entry of the `mcpServers` map.
///
/// A stdio server sets `command` (plus optional `args` and `env`); an HTTP
/// server sets `url`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct McpServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Extra environment layered over the inherited one.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Resolved transport for a server entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport<'a> {
    Stdio {
        command: &'a str,
        args: &'a [String],
        env: &'a BTreeMap<String, String>,
    },
    Http {
        url: &'a str,
    },
}

impl McpServerConfig {
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: Some(command.into()),
            args,
            ..Self::default()
        }
    }

    /// Work out which transport this entry describes. `command` wins when both are set.
    pub fn transport(&self, server: &str) -> Result<Transport<'_>, McpError> {
        match (&self.command, &self.url) {
            (Some(command), _) if command.trim().is_empty() => Err(McpError::InvalidConfig {
                server: server.to_string(),
                reason: "The command must be a valid string and cannot be empty.".to_string(),
            }),
            (Some(command), _) => Ok(Transport::Stdio {
                command,
                args: &self.args,
                env: &self.env,
            }),
            (None, Some(url)) => Ok(Transport::Http { url }),
            (None, None) => Err(McpError::InvalidConfig {
                server: server.to_string(),
                reason: "MCP config must include either 'command' or 'url'.".to_string(),
            }),
        }
    }
}

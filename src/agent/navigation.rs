//! Browser command executor backed by MCP servers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::prompt::navigation_prompt;
use super::{Agent, AgentBehavior};
use crate::mcp::McpServer;
use crate::tools::ToolSpec;

pub type NavigationAgent = Agent<NavigationBehavior>;

pub struct NavigationBehavior {
    servers: Vec<Arc<McpServer>>,
}

impl NavigationBehavior {
    pub fn new(servers: Vec<Arc<McpServer>>) -> Self {
        Self { servers }
    }
}

#[async_trait]
impl AgentBehavior for NavigationBehavior {
    fn name(&self) -> &str {
        "NavigationAgent"
    }

    /// Aggregate tools from every server. A server that fails to list is skipped.
    async fn tools(&mut self) -> Vec<ToolSpec> {
        let mut all = Vec::new();
        for server in &self.servers {
            match server.list_tools().await {
                Ok(tools) => all.extend(tools),
                Err(e) => tracing::error!("Error listing tools on server {}: {}", server.name(), e),
            }
        }
        all
    }

    async fn execute_tool(&mut self, name: &str, arguments: Value) -> anyhow::Result<String> {
        for server in &self.servers {
            let tools = match server.list_tools().await {
                Ok(tools) => tools,
                Err(e) => {
                    tracing::warn!("Error listing tools on server {}: {}", server.name(), e);
                    continue;
                }
            };
            if tools.iter().any(|t| t.name == name) {
                let result = server.execute_tool(name, arguments).await?;
                return Ok(result.to_text());
            }
        }
        anyhow::bail!("No server found with tool: {}", name)
    }

    fn system_prompt(&self, tools_description: &str) -> String {
        navigation_prompt(tools_description)
    }

    async fn on_initialize(&mut self) -> anyhow::Result<()> {
        for server in &self.servers {
            if server.is_initialized().await {
                continue;
            }
            if let Err(e) = server.initialize().await {
                tracing::error!("Failed to initialize server {}: {}", server.name(), e);
                anyhow::bail!("Failed to initialize server: {}", e);
            }
        }
        tracing::info!("Navigation agent initialized with {} servers", self.servers.len());
        Ok(())
    }

    async fn on_cleanup(&mut self) -> anyhow::Result<()> {
        for server in &self.servers {
            server.cleanup().await;
        }
        tracing::info!("Navigation agent cleaned up");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::AgentLimits;
    use crate::llm::testing::ScriptedLlm;
    use crate::mcp::testing::{FakeConnector, FakeServer};
    use crate::mcp::{McpServerConfig, ServerOptions};

    fn fake_server(name: &str) -> Arc<McpServer> {
        let options = ServerOptions {
            retry_delay: Duration::from_millis(10),
            ..ServerOptions::default()
        };
        Arc::new(
            McpServer::with_connector(
                name,
                Box::new(FakeConnector {
                    server: FakeServer::default(),
                }),
            )
            .with_options(options),
        )
    }

    #[tokio::test]
    async fn navigates_through_mcp_tool() {
        let server = fake_server("playwright");
        let llm = Arc::new(ScriptedLlm::new([
            r#"{"tool": "browser_navigate", "arguments": {"url": "https://github.com"}}"#,
            "Navigated to github.com",
        ]));
        let mut agent = Agent::new(
            NavigationBehavior::new(vec![server.clone()]),
            llm.clone(),
            AgentLimits::default(),
        );

        let reply = agent.process_message("Navigate to github.com").await.unwrap();
        assert_eq!(reply, "Navigated to github.com");
        assert_eq!(
            agent.last_tool_result(),
            "Tool execution result: browser_navigate: https://github.com"
        );

        let (system, _) = llm.request(0);
        assert!(system.contains("Tool: browser_navigate"));
        assert!(system.contains("- url: The URL to navigate to (required)"));
        assert!(system.contains("Tool: browser_snapshot"));

        agent.cleanup().await.unwrap();
        assert!(!server.is_initialized().await);
    }

    #[tokio::test]
    async fn unknown_tool_on_all_servers() {
        let mut behavior = NavigationBehavior::new(vec![fake_server("playwright")]);
        behavior.on_initialize().await.unwrap();
        let err = behavior
            .execute_tool("browser_fly", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No server found with tool: browser_fly");
    }

    #[tokio::test]
    async fn unlistable_server_is_skipped() {
        let ready = fake_server("playwright");
        ready.initialize().await.unwrap();
        let idle = fake_server("idle");

        let mut behavior = NavigationBehavior::new(vec![idle, ready]);
        assert_eq!(behavior.tools().await.len(), 2);
    }

    #[tokio::test]
    async fn initialization_failure_is_reported() {
        let config: McpServerConfig =
            serde_json::from_str(r#"{"url": "http://localhost:8931/mcp"}"#).unwrap();
        let mut behavior = NavigationBehavior::new(vec![Arc::new(McpServer::new("remote", config))]);
        let err = behavior.on_initialize().await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to initialize server:"));
    }
}

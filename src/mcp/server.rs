//! A named MCP server with session recovery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use super::config::{McpServerConfig, Transport};
use super::protocol::CallToolResult;
use super::{McpError, McpSession};
use crate::tools::ToolSpec;

/// Opens a fresh session to a server.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<McpSession, McpError>;
}

/// Launches the configured command and talks to it over stdio.
pub struct StdioConnector {
    name: String,
    config: McpServerConfig,
}

impl StdioConnector {
    pub fn new(name: impl Into<String>, config: McpServerConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

#[async_trait]
impl Connector for StdioConnector {
    async fn connect(&self) -> Result<McpSession, McpError> {
        match self.config.transport(&self.name)? {
            Transport::Stdio { command, args, env } => McpSession::spawn_stdio(command, args, env),
            Transport::Http { url } => {
                tracing::error!("HTTP transport is not supported ({}): {}", self.name, url);
                Err(McpError::UnsupportedTransport(self.name.clone()))
            }
        }
    }
}

/// Timeouts and retry counts for one server.
#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    pub init_timeout: Duration,
    pub call_timeout: Duration,
    pub attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            init_timeout: Duration::from_secs(20),
            call_timeout: Duration::from_secs(60),
            attempts: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

pub struct McpServer {
    name: String,
    connector: Box<dyn Connector>,
    options: ServerOptions,
    session: RwLock<Option<Arc<McpSession>>>,
    cached_tools: RwLock<Vec<ToolSpec>>,
    cleanup_lock: Mutex<()>,
}

impl McpServer {
    pub fn new(name: impl Into<String>, config: McpServerConfig) -> Self {
        let name = name.into();
        let connector = StdioConnector::new(name.clone(), config);
        Self::with_connector(name, Box::new(connector))
    }

    pub fn with_connector(name: impl Into<String>, connector: Box<dyn Connector>) -> Self {
        Self {
            name: name.into(),
            connector,
            options: ServerOptions::default(),
            session: RwLock::new(None),
            cached_tools: RwLock::new(Vec::new()),
            cleanup_lock: Mutex::new(()),
        }
    }

    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn is_initialized(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Connect and run the handshake.
    ///
    /// A handshake that does not finish within the init timeout is logged and
    /// the session is kept; some servers answer `initialize` late but serve
    /// tool calls fine.
    pub async fn initialize(&self) -> Result<(), McpError> {
        let session = Arc::new(self.connector.connect().await?);
        *self.session.write().await = Some(session.clone());
        tracing::info!("Created client session for {}", self.name);

        match tokio::time::timeout(self.options.init_timeout, session.initialize()).await {
            Ok(Ok(result)) => {
                tracing::info!(
                    server = %self.name,
                    protocol = %result.protocol_version,
                    remote = ?result.server_info.as_ref().map(|s| s.name.as_str()),
                    "Client session is initialized"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!("Error initializing client session {}: {}", self.name, e);
                self.cleanup().await;
                Err(e)
            }
            Err(_) => {
                tracing::error!("Timeout while initializing client session {}", self.name);
                Ok(())
            }
        }
    }

    async fn current_session(&self) -> Result<Arc<McpSession>, McpError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| McpError::NotInitialized(self.name.clone()))
    }

    /// Tools exposed by the server. The first non-empty listing is cached.
    pub async fn list_tools(&self) -> Result<Vec<ToolSpec>, McpError> {
        let session = self.current_session().await?;

        {
            let cached = self.cached_tools.read().await;
            if !cached.is_empty() {
                return Ok(cached.clone());
            }
        }

        tracing::debug!("Getting list of tools from {}", self.name);
        let tools = session.list_tools().await?;
        *self.cached_tools.write().await = tools.clone();
        Ok(tools)
    }

    /// Call a tool, recovering the session between attempts.
    pub async fn execute_tool(
        &self,
        tool: &str,
        arguments: Value,
    ) -> Result<CallToolResult, McpError> {
        self.current_session().await?;

        let attempts = self.options.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::info!("Executing {} with arguments: {}", tool, arguments);

            let outcome = match self.current_session().await {
                Ok(session) => {
                    match tokio::time::timeout(
                        self.options.call_timeout,
                        session.call_tool(tool, arguments.clone()),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(McpError::Timeout {
                            operation: format!("tool {}", tool),
                            timeout: self.options.call_timeout,
                        }),
                    }
                }
                Err(e) => Err(e),
            };

            let err = match outcome {
                Ok(result) => {
                    tracing::debug!("Tool execution is done");
                    return Ok(result);
                }
                Err(e) => e,
            };

            tracing::warn!(
                "Error executing tool: {}. Attempt {} of {}.",
                err,
                attempt,
                attempts
            );

            tracing::info!("Attempting to recover session for {}...", self.name);
            self.cleanup().await;
            match self.initialize().await {
                Ok(()) => tracing::info!("Session recovered successfully."),
                Err(e) => tracing::error!("Error during session recovery: {}", e),
            }

            if attempt >= attempts {
                tracing::error!("Max retries reached. Failing.");
                return Err(err);
            }
            tracing::info!("Retrying in {:?}...", self.options.retry_delay);
            tokio::time::sleep(self.options.retry_delay).await;
        }
    }

    /// Drop the session and stop the server process.
    pub async fn cleanup(&self) {
        let _guard = self.cleanup_lock.lock().await;
        let session = self.session.write().await.take();
        if let Some(session) = session {
            tracing::info!("Cleaning up server {}...", self.name);
            session.shutdown().await;
            tracing::info!("Server {} cleaned up successfully.", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::super::testing::{FakeConnector, FakeServer};
    use super::*;

    fn fast() -> ServerOptions {
        ServerOptions {
            init_timeout: Duration::from_millis(200),
            call_timeout: Duration::from_secs(5),
            attempts: 2,
            retry_delay: Duration::from_millis(10),
        }
    }

    fn server(fake: FakeServer) -> McpServer {
        McpServer::with_connector("playwright", Box::new(FakeConnector { server: fake }))
            .with_options(fast())
    }

    #[tokio::test]
    async fn requires_initialization() {
        let server = server(FakeServer::default());
        assert!(matches!(
            server.list_tools().await,
            Err(McpError::NotInitialized(_))
        ));
        let err = server
            .execute_tool("browser_navigate", json!({}))
            .await
            .expect_err("not initialized");
        assert_eq!(err.to_string(), "Server playwright is not initialized");
    }

    #[tokio::test]
    async fn lists_and_caches_tools() {
        let fake = FakeServer::default();
        let state = fake.state.clone();
        let server = server(fake);
        server.initialize().await.expect("initialize");

        let first = server.list_tools().await.expect("tools");
        assert_eq!(first.len(), 2);
        let second = server.list_tools().await.expect("cached");
        assert_eq!(second.len(), 2);
        assert_eq!(state.connections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_session_after_connection_loss() {
        let fake = FakeServer {
            hang_up_on: Some("browser_navigate".to_string()),
            ..FakeServer::default()
        };
        let state = fake.state.clone();
        let server = server(fake);
        server.initialize().await.expect("initialize");

        let result = server
            .execute_tool("browser_navigate", json!({"url": "https://github.com"}))
            .await
            .expect("second attempt succeeds");
        assert_eq!(result.to_text(), "browser_navigate: https://github.com");
        assert_eq!(state.connections.load(Ordering::SeqCst), 2);
        assert_eq!(state.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_last_attempt() {
        let fake = FakeServer::default();
        let state = fake.state.clone();
        let server = server(fake);
        server.initialize().await.expect("initialize");

        let err = server
            .execute_tool("browser_fly", json!({}))
            .await
            .expect_err("unknown tool");
        assert!(matches!(err, McpError::Rpc { code: -32602, .. }));
        assert_eq!(state.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unanswered_call_times_out_each_attempt() {
        let fake = FakeServer {
            stall_calls: true,
            ..FakeServer::default()
        };
        let state = fake.state.clone();
        let server = server(fake).with_options(ServerOptions {
            call_timeout: Duration::from_millis(50),
            ..fast()
        });
        server.initialize().await.expect("initialize");

        let err = server
            .execute_tool("browser_snapshot", json!({}))
            .await
            .expect_err("no reply");
        assert!(matches!(err, McpError::Timeout { .. }));
        assert_eq!(state.calls.load(Ordering::SeqCst), 2);
        // One recovery after each failed attempt.
        assert_eq!(state.connections.load(Ordering::SeqCst), 3);
        assert!(server.is_initialized().await);
    }

    #[tokio::test]
    async fn slow_handshake_keeps_session() {
        let server = server(FakeServer {
            stall_initialize: true,
            ..FakeServer::default()
        });
        server.initialize().await.expect("timeout is not fatal");
        assert!(server.is_initialized().await);
        assert_eq!(server.list_tools().await.expect("tools").len(), 2);
    }

    #[tokio::test]
    async fn url_config_is_unsupported() {
        let config: McpServerConfig =
            serde_json::from_str(r#"{"url": "http://localhost:8931/mcp"}"#).unwrap();
        let server = McpServer::new("remote", config);
        assert!(matches!(
            server.initialize().await,
            Err(McpError::UnsupportedTransport(_))
        ));
        assert!(!server.is_initialized().await);
    }

    #[tokio::test]
    async fn cleanup_drops_session() {
        let server = server(FakeServer::default());
        server.initialize().await.expect("initialize");
        server.cleanup().await;
        assert!(!server.is_initialized().await);
        server.cleanup().await;
    }
}

//! Model Context Protocol client.
//!
//! Browser actions are provided by external MCP servers (for example the
//! Playwright MCP server) launched as child processes and driven over
//! stdio with JSON-RPC 2.0.

mod config;
mod error;
mod protocol;
mod server;
mod session;

pub use config::{McpServerConfig, Transport};
pub use error::McpError;
pub use protocol::{CallToolResult, InitializeResult, PROTOCOL_VERSION};
pub use server::{Connector, McpServer, ServerOptions, StdioConnector};
pub use session::McpSession;

#[cfg(test)]
pub(crate) mod testing {
    //! In-process fake MCP server over `tokio::io::duplex`.

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::task::JoinHandle;

    use super::{Connector, McpError, McpSession};

    #[derive(Debug, Default)]
    pub struct FakeState {
        pub connections: AtomicUsize,
        pub calls: AtomicUsize,
        pub pong_received: AtomicBool,
        /// Set once the `hang_up_on` tool has dropped a connection.
        pub hung_up: AtomicBool,
    }

    /// Scripted browser server exposing `browser_navigate` and `browser_snapshot`.
    #[derive(Debug, Clone, Default)]
    pub struct FakeServer {
        /// Send a `ping` request before answering each `tools/call`.
        pub ping_before_call: bool,
        /// Drop the connection the first time this tool is called.
        pub hang_up_on: Option<String>,
        /// Never answer `initialize`.
        pub stall_initialize: bool,
        /// Never answer `tools/call`.
        pub stall_calls: bool,
        pub state: Arc<FakeState>,
    }

    pub struct FakeHandle {
        pub state: Arc<FakeState>,
        _task: JoinHandle<()>,
    }

    impl FakeServer {
        pub fn connect(self) -> (McpSession, FakeHandle) {
            let (client_io, server_io) = tokio::io::duplex(64 * 1024);
            let (client_read, client_write) = tokio::io::split(client_io);
            let state = self.state.clone();
            state.connections.fetch_add(1, Ordering::SeqCst);
            let task = tokio::spawn(self.serve(server_io));
            (
                McpSession::connect(client_read, client_write),
                FakeHandle { state, _task: task },
            )
        }

        async fn serve(self, io: tokio::io::DuplexStream) {
            let (read, mut write) = tokio::io::split(io);
            let mut lines = BufReader::new(read).lines();

            while let Ok(Some(line)) = lines.next_line().await {
                let Ok(message) = serde_json::from_str::<Value>(&line) else {
                    continue;
                };
                let Some(method) = message["method"].as_str() else {
                    continue;
                };
                let id = message["id"].clone();

                let reply = match method {
                    "initialize" if self.stall_initialize => continue,
                    "initialize" => json!({"jsonrpc": "2.0", "id": id, "result": {
                        "protocolVersion": super::PROTOCOL_VERSION,
                        "capabilities": {"tools": {}},
                        "serverInfo": {"name": "fake-browser", "version": "0.0.1"}
                    }}),
                    "notifications/initialized" => continue,
                    "tools/list" => {
                        let page2 = message["params"]["cursor"] == "page-2";
                        let result = if page2 {
                            json!({"tools": [{
                                "name": "browser_snapshot",
                                "description": "Capture accessibility snapshot of the current page",
                                "inputSchema": {"type": "object", "properties": {}}
                            }]})
                        } else {
                            json!({"tools": [{
                                "name": "browser_navigate",
                                "description": "Navigate to a URL",
                                "inputSchema": {
                                    "type": "object",
                                    "properties": {"url": {"type": "string", "description": "The URL to navigate to"}},
                                    "required": ["url"]
                                }
                            }], "nextCursor": "page-2"})
                        };
                        json!({"jsonrpc": "2.0", "id": id, "result": result})
                    }
                    "tools/call" => {
                        self.state.calls.fetch_add(1, Ordering::SeqCst);
                        if self.stall_calls {
                            continue;
                        }
                        let name = message["params"]["name"].as_str().unwrap_or_default().to_string();

                        if self.hang_up_on.as_deref() == Some(name.as_str())
                            && !self.state.hung_up.swap(true, Ordering::SeqCst)
                        {
                            return;
                        }

                        if self.ping_before_call {
                            let ping = json!({"jsonrpc": "2.0", "id": "srv-1", "method": "ping"});
                            if write_json(&mut write, &ping).await.is_err() {
                                return;
                            }
                            if let Ok(Some(pong)) = lines.next_line().await {
                                let pong: Value = serde_json::from_str(&pong).unwrap_or_default();
                                if pong["id"] == "srv-1" && pong.get("result").is_some() {
                                    self.state.pong_received.store(true, Ordering::SeqCst);
                                }
                            }
                        }

                        match name.as_str() {
                            "browser_navigate" | "browser_snapshot" | "browser_close" => {
                                let url = message["params"]["arguments"]["url"]
                                    .as_str()
                                    .unwrap_or("current page");
                                json!({"jsonrpc": "2.0", "id": id, "result": {
                                    "content": [{"type": "text", "text": format!("{}: {}", name, url)}]
                                }})
                            }
                            _ => json!({"jsonrpc": "2.0", "id": id, "error": {
                                "code": -32602, "message": format!("Tool {} not found", name)
                            }}),
                        }
                    }
                    _ => json!({"jsonrpc": "2.0", "id": id, "error": {
                        "code": -32601, "message": "Method not found"
                    }}),
                };

                if write_json(&mut write, &reply).await.is_err() {
                    return;
                }
            }
        }
    }

    async fn write_json<W>(write: &mut W, value: &Value) -> std::io::Result<()>
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        write.write_all(value.to_string().as_bytes()).await?;
        write.write_all(b"\n").await?;
        write.flush().await
    }

    /// Connector that opens a fresh fake server on every connect.
    pub struct FakeConnector {
        pub server: FakeServer,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(&self) -> Result<McpSession, McpError> {
            let (session, _handle) = self.server.clone().connect();
            Ok(session)
        }
    }
}

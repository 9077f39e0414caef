//! A JSON-RPC session with one MCP server over a byte stream.
//!
//! Messages are newline-delimited JSON. A background reader task routes
//! responses to the waiting request by id, answers `ping`, and fails every
//! outstanding request once the stream closes.

use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use super::protocol::{
    initialize_params, response_line, CallToolResult, Incoming, IncomingMessage,
    InitializeResult, JsonRpcNotification, JsonRpcRequest, ListToolsResult, RpcErrorObject,
    JSONRPC_VERSION, METHOD_NOT_FOUND,
};
use super::McpError;
use crate::tools::ToolSpec;

type Writer = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, RpcErrorObject>>>>>;

pub struct McpSession {
    writer: Writer,
    pending: Pending,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
    child: Mutex<Option<Child>>,
}

impl McpSession {
    /// Start a session over an existing stream pair.
    pub fn connect<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::start(reader, writer, None)
    }

    fn start<R, W>(reader: R, writer: W, child: Option<Child>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: Writer = Arc::new(Mutex::new(Box::new(writer)));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_loop(reader, writer.clone(), pending.clone()));

        Self {
            writer,
            pending,
            next_id: AtomicU64::new(1),
            reader,
            child: Mutex::new(child),
        }
    }

    /// Spawn `command` and talk to it over its stdin/stdout.
    ///
    /// `env` is layered over the inherited environment. stderr is passed
    /// through so server logs stay visible.
    pub fn spawn_stdio(
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<Self, McpError> {
        tracing::info!("Spawning MCP server: {} {}", command, args.join(" "));
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| McpError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            McpError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "child stdin unavailable",
            ))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            McpError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "child stdout unavailable",
            ))
        })?;

        Ok(Self::start(stdout, stdin, Some(child)))
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);
        let _entry = PendingEntry {
            pending: self.pending.clone(),
            id,
        };

        let line = serde_json::to_string(&JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        })?;
        write_line(&self.writer, &line).await?;

        match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(McpError::Rpc {
                code: err.code,
                message: err.message,
            }),
            Err(_) => Err(McpError::ConnectionClosed),
        }
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let line = serde_json::to_string(&JsonRpcNotification {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
        })?;
        write_line(&self.writer, &line).await?;
        Ok(())
    }

    /// Protocol handshake: `initialize` followed by `notifications/initialized`.
    pub async fn initialize(&self) -> Result<InitializeResult, McpError> {
        let result = self.request("initialize", Some(initialize_params())).await?;
        let result: InitializeResult = serde_json::from_value(result)?;
        self.notify("notifications/initialized", None).await?;
        Ok(result)
    }

    /// List every tool, following pagination cursors.
    pub async fn list_tools(&self) -> Result<Vec<ToolSpec>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let page: ListToolsResult =
                serde_json::from_value(self.request("tools/list", params).await?)?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(tools)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        let result = self
            .request(
                "tools/call",
                Some(json!({ "name": name, "arguments": arguments })),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Stop the reader and terminate the server process, if we own one.
    pub async fn shutdown(&self) {
        self.reader.abort();
        self.pending.lock().await.clear();
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                tracing::debug!("Failed to kill MCP server process: {}", e);
            }
        }
    }
}

/// Removes a request's slot when the caller stops waiting, e.g. on timeout.
struct PendingEntry {
    pending: Pending,
    id: u64,
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.try_lock() {
            pending.remove(&self.id);
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let pending = self.pending.clone();
            let id = self.id;
            handle.spawn(async move {
                pending.lock().await.remove(&id);
            });
        }
    }
}

impl Drop for McpSession {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn write_line(writer: &Writer, line: &str) -> std::io::Result<()> {
    let mut writer = writer.lock().await;
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

async fn read_loop<R>(reader: R, writer: Writer, pending: Pending)
where
    R: AsyncRead + Send + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Error reading from MCP server: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message: IncomingMessage = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(_) => {
                tracing::debug!("Ignoring non-JSON line from MCP server: {}", line);
                continue;
            }
        };

        match message.classify() {
            Incoming::Response { id, outcome } => {
                match pending.lock().await.remove(&id) {
                    Some(tx) => {
                        let _ = tx.send(outcome);
                    }
                    None => tracing::debug!("Response for unknown request id {}", id),
                }
            }
            Incoming::Request { id, method } => {
                let outcome = if method == "ping" {
                    Ok(json!({}))
                } else {
                    Err(RpcErrorObject {
                        code: METHOD_NOT_FOUND,
                        message: format!("Method not found: {}", method),
                        data: None,
                    })
                };
                let reply = response_line(&id, outcome).to_string();
                if let Err(e) = write_line(&writer, &reply).await {
                    tracing::warn!("Failed to answer server request {}: {}", method, e);
                }
            }
            Incoming::Notification { method } => {
                tracing::debug!("MCP notification: {}", method);
            }
            Incoming::Invalid => {
                tracing::debug!("Ignoring malformed MCP message: {}", line);
            }
        }
    }

    // Dropping the senders fails every outstanding request.
    pending.lock().await.clear();
    tracing::debug!("MCP server stream closed");
}

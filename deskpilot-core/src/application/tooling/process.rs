use super::error::ToolInvokeError;
use super::interface::{DiscoveredTool, ProviderConnection, ProviderState};
use crate::config::ServerConfig;
use crate::constants::{DEFAULT_HANDSHAKE_TIMEOUT_SECS, MCP_PROTOCOL_VERSION};
use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, info, warn};

type PendingMap = HashMap<String, oneshot::Sender<Result<Value, ToolInvokeError>>>;

/// MCP server spoken to over newline-delimited JSON-RPC on stdio.
#[derive(Clone)]
pub struct McpProcess {
    inner: Arc<McpProcessInner>,
}

struct McpProcessInner {
    server: ServerConfig,
    status: AsyncMutex<ProviderState>,
    child: AsyncMutex<Option<Child>>,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    pending: AsyncMutex<PendingMap>,
    id_counter: AtomicU64,
    instructions: AsyncMutex<Option<String>>,
    tool_cache: AsyncMutex<Vec<DiscoveredTool>>,
    handshake_timeout: Duration,
}

impl McpProcess {
    /// Spawns the server and runs the handshake. A failing step leaves no
    /// process behind.
    pub async fn connect(server: ServerConfig) -> Result<Self, ToolInvokeError> {
        Self::connect_with_timeout(server, Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS))
            .await
    }

    pub async fn connect_with_timeout(
        server: ServerConfig,
        handshake_timeout: Duration,
    ) -> Result<Self, ToolInvokeError> {
        let process = Self {
            inner: Arc::new(McpProcessInner {
                server,
                status: AsyncMutex::new(ProviderState::Starting),
                child: AsyncMutex::new(None),
                writer: AsyncMutex::new(None),
                pending: AsyncMutex::new(HashMap::new()),
                id_counter: AtomicU64::new(1),
                instructions: AsyncMutex::new(None),
                tool_cache: AsyncMutex::new(Vec::new()),
                handshake_timeout,
            }),
        };
        process.inner.start().await?;
        Ok(process)
    }
}

#[async_trait]
impl ProviderConnection for McpProcess {
    fn id(&self) -> &str {
        &self.inner.server.name
    }

    async fn state(&self) -> ProviderState {
        *self.inner.status.lock().await
    }

    async fn discover(&self) -> Result<Vec<DiscoveredTool>, ToolInvokeError> {
        if self.state().await.is_terminated() {
            return Err(self.inner.terminated());
        }
        Ok(self.inner.tool_cache.lock().await.clone())
    }

    async fn invoke(
        &self,
        tool: &str,
        arguments: Value,
        timeout: Duration,
    ) -> Result<Value, ToolInvokeError> {
        if self.state().await.is_terminated() {
            return Err(self.inner.terminated());
        }
        let result = self.inner.call_tool(tool, arguments, timeout).await;
        match &result {
            Ok(_) => self.inner.mark(ProviderState::Ready).await,
            Err(ToolInvokeError::Timeout { .. }) => {
                self.inner.mark(ProviderState::Degraded).await
            }
            Err(_) => {}
        }
        result
    }

    async fn instructions(&self) -> Option<String> {
        self.inner.instructions.lock().await.clone()
    }

    async fn shutdown(&self) {
        info!(server = %self.inner.server.name, "Shutting down MCP server");
        self.inner.reset().await;
    }
}

impl McpProcessInner {
    async fn start(self: &Arc<Self>) -> Result<(), ToolInvokeError> {
        let mut command = Command::new(&self.server.command);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &self.server.workdir {
            command.current_dir(dir);
        }
        if !self.server.args.is_empty() {
            command.args(&self.server.args);
        }
        for (key, value) in &self.server.env {
            command.env(key, value);
        }

        debug!(
            server = %self.server.name,
            command = %self.server.command.display(),
            "Spawning MCP server"
        );
        let mut child = command.spawn().map_err(|source| ToolInvokeError::Spawn {
            server: self.server.name.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.transport_error("failed to capture server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.transport_error("failed to capture server stdout"))?;

        *self.writer.lock().await = Some(BufWriter::new(stdin));
        *self.child.lock().await = Some(child);

        let reader_self = Arc::clone(self);
        tokio::spawn(async move {
            reader_self.reader_loop(stdout).await;
        });

        match self.initialize_sequence().await {
            Ok(()) => {
                self.mark(ProviderState::Ready).await;
                Ok(())
            }
            Err(err) => {
                self.reset().await;
                Err(err)
            }
        }
    }

    async fn initialize_sequence(&self) -> Result<(), ToolInvokeError> {
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "title": "deskpilot"
            },
            "capabilities": {}
        });
        let init_result = self
            .send_request("initialize", params, self.handshake_timeout)
            .await?;
        if let Some(text) = init_result.get("instructions").and_then(Value::as_str) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                *self.instructions.lock().await = Some(trimmed.to_string());
            }
        }
        self.send_notification("notifications/initialized", json!({}))
            .await?;

        self.refresh_tools().await?;
        let count = self.tool_cache.lock().await.len();
        info!(server = %self.server.name, tools = count, "MCP server ready");
        Ok(())
    }

    async fn call_tool(
        &self,
        tool: &str,
        arguments: Value,
        timeout: Duration,
    ) -> Result<Value, ToolInvokeError> {
        let params = json!({
            "name": tool,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            }
        });
        self.send_request("tools/call", params, timeout).await
    }

    async fn refresh_tools(&self) -> Result<(), ToolInvokeError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(value) => json!({ "cursor": value }),
                None => json!({}),
            };
            let result = self
                .send_request("tools/list", params, self.handshake_timeout)
                .await?;
            tools.extend(parse_tool_list(&result));

            let next = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if next.is_none() || next == cursor {
                break;
            }
            cursor = next;
        }
        *self.tool_cache.lock().await = tools;
        Ok(())
    }

    async fn reader_loop(self: Arc<Self>, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(raw)) = lines.next_line().await {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !trimmed.starts_with('{') {
                debug!(
                    server = %self.server.name,
                    line = trimmed,
                    "skipping non-JSON line from MCP server"
                );
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => {
                    if let Err(err) = self.process_inbound_message(value).await {
                        warn!(
                            server = %self.server.name,
                            %err,
                            "failed to process message from MCP server"
                        );
                    }
                }
                Err(source) => {
                    warn!(
                        server = %self.server.name,
                        line = trimmed,
                        %source,
                        "received invalid JSON from MCP server"
                    );
                }
            }
        }

        if !self.status.lock().await.is_terminated() {
            warn!(server = %self.server.name, "MCP server closed its output stream");
        }
        self.reset().await;
    }

    async fn process_inbound_message(self: &Arc<Self>, value: Value) -> Result<(), ToolInvokeError> {
        match (value.get("id").cloned(), value.get("method").is_some()) {
            (Some(id), true) => self.handle_server_request(id, value).await,
            (Some(id), false) => {
                self.handle_response(id, value).await;
                Ok(())
            }
            (None, true) => {
                self.handle_notification(value);
                Ok(())
            }
            (None, false) => Ok(()),
        }
    }

    async fn handle_response(&self, id: Value, value: Value) {
        let Some(key) = response_key(&id) else {
            return;
        };

        let responder = self.pending.lock().await.remove(&key);
        let Some(sender) = responder else {
            debug!(
                server = %self.server.name,
                response_id = key,
                "received response for unknown or expired request"
            );
            return;
        };

        let outcome = match value.get("error") {
            Some(Value::Object(err)) => Err(ToolInvokeError::Rpc {
                server: self.server.name.clone(),
                code: err.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
            Some(_) => Err(self.transport_error("malformed error payload in response")),
            None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
        };
        let _ = sender.send(outcome);
    }

    async fn handle_server_request(&self, id: Value, value: Value) -> Result<(), ToolInvokeError> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        match method {
            "ping" => self.send_response(id, json!({})).await,
            "elicitation/create" => {
                let params = value.get("params").cloned().unwrap_or(Value::Null);
                self.send_response(id, elicitation_ack(&params)).await
            }
            other => {
                warn!(
                    server = %self.server.name,
                    method = other,
                    "server sent unsupported request"
                );
                let error = json!({
                    "code": -32601,
                    "message": format!("client does not implement method '{other}'"),
                });
                self.send_error(id, error).await
            }
        }
    }

    fn handle_notification(self: &Arc<Self>, value: Value) {
        let Some(method) = value.get("method").and_then(Value::as_str) else {
            return;
        };
        debug!(server = %self.server.name, method, "received notification from server");
        if method == "notifications/tools/list_changed" {
            // The reader task must stay free to deliver the tools/list response.
            let this = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(err) = this.refresh_tools().await {
                    warn!(
                        server = %this.server.name,
                        %err,
                        "failed to refresh tool catalogue"
                    );
                }
            });
        }
    }

    async fn send_request(
        &self,
        method: &str,
        params: Value,
        limit: Duration,
    ) -> Result<Value, ToolInvokeError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        let exchange = async {
            self.write_message(&payload).await?;
            match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(ToolInvokeError::Cancelled {
                    server: self.server.name.clone(),
                }),
            }
        };

        let outcome = match tokio::time::timeout(limit, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ToolInvokeError::Timeout {
                server: self.server.name.clone(),
                method: method.to_string(),
                timeout: limit,
            }),
        };
        if outcome.is_err() {
            self.pending.lock().await.remove(&id);
        }
        outcome
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        self.write_message(&payload).await
    }

    async fn send_response(&self, id: Value, result: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result
        });
        self.write_message(&payload).await
    }

    async fn send_error(&self, id: Value, error: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": error
        });
        self.write_message(&payload).await
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolInvokeError> {
        let mut encoded =
            serde_json::to_string(message).map_err(|source| ToolInvokeError::InvalidJson {
                server: self.server.name.clone(),
                source,
            })?;
        encoded.push('\n');

        let mut writer = self.writer.lock().await;
        let stream = writer.as_mut().ok_or_else(|| self.terminated())?;
        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        Ok(())
    }

    async fn mark(&self, next: ProviderState) {
        let mut status = self.status.lock().await;
        if !status.is_terminated() {
            *status = next;
        }
    }

    async fn reset(&self) {
        *self.status.lock().await = ProviderState::Terminated;
        *self.writer.lock().await = None;

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.kill().await {
                debug!(
                    server = %self.server.name,
                    %err,
                    "failed to kill MCP server process (may have already exited)"
                );
            }
            let _ = child.wait().await;
        }

        self.fail_all_pending().await;
        self.tool_cache.lock().await.clear();
    }

    async fn fail_all_pending(&self) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(self.terminated()));
        }
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }

    fn terminated(&self) -> ToolInvokeError {
        ToolInvokeError::Terminated {
            server: self.server.name.clone(),
        }
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Transport {
            server: self.server.name.clone(),
            message: message.into(),
        }
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

fn parse_tool_list(result: &Value) -> Vec<DiscoveredTool> {
    let Some(array) = result.get("tools").and_then(Value::as_array) else {
        return Vec::new();
    };
    array
        .iter()
        .filter_map(|tool| {
            let name = tool.get("name").and_then(Value::as_str)?;
            Some(DiscoveredTool {
                name: name.to_string(),
                description: tool
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                input_schema: tool.get("inputSchema").cloned(),
            })
        })
        .collect()
}

/// Accepts an elicitation without user input; the agent runs unattended.
fn elicitation_ack(params: &Value) -> Value {
    let mut content = JsonMap::new();
    if let Some(message) = params.get("message").and_then(Value::as_str) {
        let trimmed = message.trim();
        if !trimmed.is_empty() {
            content.insert("message".to_string(), Value::String(trimmed.to_string()));
        }
    }
    json!({ "action": "accept", "content": Value::Object(content) })
}

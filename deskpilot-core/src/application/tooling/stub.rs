//! In-memory provider for unit tests.

use super::error::ToolInvokeError;
use super::interface::{DiscoveredTool, ProviderConnection, ProviderState};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Clone)]
enum Behavior {
    Respond(Value),
    Hang,
    Fail(String),
}

pub(crate) struct StubProvider {
    id: String,
    tools: Vec<DiscoveredTool>,
    behaviors: HashMap<String, Behavior>,
    state: Mutex<ProviderState>,
    instructions: Option<String>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl StubProvider {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tools: Vec::new(),
            behaviors: HashMap::new(),
            state: Mutex::new(ProviderState::Ready),
            instructions: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn with_tool(mut self, tool: DiscoveredTool) -> Self {
        self.tools.push(tool);
        self
    }

    pub(crate) fn with_instructions(mut self, text: &str) -> Self {
        self.instructions = Some(text.to_string());
        self
    }

    pub(crate) fn respond(mut self, tool: &str, raw: Value) -> Self {
        self.behaviors.insert(tool.to_string(), Behavior::Respond(raw));
        self
    }

    pub(crate) fn hang(mut self, tool: &str) -> Self {
        self.behaviors.insert(tool.to_string(), Behavior::Hang);
        self
    }

    pub(crate) fn fail(mut self, tool: &str, message: &str) -> Self {
        self.behaviors
            .insert(tool.to_string(), Behavior::Fail(message.to_string()));
        self
    }

    pub(crate) fn terminated(self) -> Self {
        Self {
            state: Mutex::new(ProviderState::Terminated),
            ..self
        }
    }

    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<(String, Value)>>> {
        Arc::clone(&self.calls)
    }

    fn terminated_error(&self) -> ToolInvokeError {
        ToolInvokeError::Terminated {
            server: self.id.clone(),
        }
    }
}

#[async_trait]
impl ProviderConnection for StubProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn state(&self) -> ProviderState {
        *self.state.lock().await
    }

    async fn discover(&self) -> Result<Vec<DiscoveredTool>, ToolInvokeError> {
        if self.state().await.is_terminated() {
            return Err(self.terminated_error());
        }
        Ok(self.tools.clone())
    }

    async fn invoke(
        &self,
        tool: &str,
        arguments: Value,
        _timeout: Duration,
    ) -> Result<Value, ToolInvokeError> {
        if self.state().await.is_terminated() {
            return Err(self.terminated_error());
        }
        self.calls.lock().await.push((tool.to_string(), arguments));
        match self.behaviors.get(tool).cloned() {
            Some(Behavior::Respond(raw)) => Ok(raw),
            Some(Behavior::Hang) => {
                std::future::pending::<()>().await;
                Ok(Value::Null)
            }
            Some(Behavior::Fail(message)) => Err(ToolInvokeError::Transport {
                server: self.id.clone(),
                message,
            }),
            None => Ok(serde_json::json!({ "content": [{ "type": "text", "text": "ok" }] })),
        }
    }

    async fn instructions(&self) -> Option<String> {
        self.instructions.clone()
    }

    async fn shutdown(&self) {
        *self.state.lock().await = ProviderState::Terminated;
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::error::ToolInvokeError;

/// Tool as announced by a provider in `tools/list`, before sanitization.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredTool {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

impl DiscoveredTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    Starting,
    Ready,
    /// Alive, but the last call stalled past its timeout.
    Degraded,
    Terminated,
}

impl ProviderState {
    pub fn is_terminated(self) -> bool {
        matches!(self, ProviderState::Terminated)
    }
}

/// A live channel to one tool-providing process.
#[async_trait]
pub trait ProviderConnection: Send + Sync {
    fn id(&self) -> &str;

    async fn state(&self) -> ProviderState;

    async fn discover(&self) -> Result<Vec<DiscoveredTool>, ToolInvokeError>;

    /// Calls `tool` by its original (unsanitized) name. Returns the raw
    /// `tools/call` result object.
    async fn invoke(
        &self,
        tool: &str,
        arguments: Value,
        timeout: Duration,
    ) -> Result<Value, ToolInvokeError>;

    async fn instructions(&self) -> Option<String>;

    async fn shutdown(&self);
}

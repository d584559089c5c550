use crate::domain::types::FailureKind;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("failed to spawn MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("MCP server '{server}' transport error: {message}")]
    Transport { server: String, message: String },
    #[error("MCP server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("MCP server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("MCP server '{server}' did not answer '{method}' within {timeout:?} (timeout)")]
    Timeout {
        server: String,
        method: String,
        timeout: Duration,
    },
    #[error("MCP server '{server}' terminated unexpectedly")]
    Terminated { server: String },
    #[error("MCP server '{server}' request cancelled")]
    Cancelled { server: String },
}

impl ToolInvokeError {
    /// Failure kind and retryable flag reported to the model for this error.
    pub fn classify(&self) -> (FailureKind, bool) {
        match self {
            ToolInvokeError::Timeout { .. } => (FailureKind::Timeout, true),
            ToolInvokeError::Terminated { .. } => (FailureKind::Unavailable, false),
            ToolInvokeError::Rpc { .. } => (FailureKind::Protocol, false),
            ToolInvokeError::Spawn { .. }
            | ToolInvokeError::Transport { .. }
            | ToolInvokeError::InvalidJson { .. }
            | ToolInvokeError::Cancelled { .. } => (FailureKind::Transport, true),
        }
    }

    /// The provider's own account of the failure, without the server name.
    /// Recovery classification reads this text.
    pub fn detail(&self) -> String {
        match self {
            ToolInvokeError::Spawn { source, .. } => format!("spawn failed: {source}"),
            ToolInvokeError::Transport { message, .. } => message.clone(),
            ToolInvokeError::InvalidJson { source, .. } => format!("invalid JSON: {source}"),
            ToolInvokeError::Rpc { code, message, .. } => {
                format!("JSON-RPC error {code}: {message}")
            }
            ToolInvokeError::Timeout {
                method, timeout, ..
            } => format!("no answer to '{method}' within {timeout:?} (timeout)"),
            ToolInvokeError::Terminated { .. } => "server terminated unexpectedly".to_string(),
            ToolInvokeError::Cancelled { .. } => "request cancelled".to_string(),
        }
    }

    pub fn server(&self) -> &str {
        match self {
            ToolInvokeError::Spawn { server, .. }
            | ToolInvokeError::Transport { server, .. }
            | ToolInvokeError::InvalidJson { server, .. }
            | ToolInvokeError::Rpc { server, .. }
            | ToolInvokeError::Timeout { server, .. }
            | ToolInvokeError::Terminated { server }
            | ToolInvokeError::Cancelled { server } => server,
        }
    }
}

/// Lookup failures in the tool registry. Distinct from provider errors: an
/// unknown identifier means the caller asked for something never registered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{identifier}' not found")]
    NotFound { identifier: String },
    #[error("tool '{identifier}' has no registered provider")]
    ProviderMissing {
        provider: String,
        identifier: String,
    },
}

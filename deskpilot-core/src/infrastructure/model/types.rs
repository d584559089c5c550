//! Model types - Request, Response, and Error types

use crate::domain::types::{ConversationMessage, StopReason, ToolInvocationRequest, ToolSchema};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

/// Everything sent to the model for one turn.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub messages: Vec<ConversationMessage>,
    pub tools: Vec<ToolSchema>,
    pub params: GenerationParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub text: String,
    pub tool_requests: Vec<ToolInvocationRequest>,
    pub stop_reason: StopReason,
}

impl CompletionResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_requests: Vec::new(),
            stop_reason: StopReason::EndTurn,
        }
    }

    pub fn tool_use(text: impl Into<String>, tool_requests: Vec<ToolInvocationRequest>) -> Self {
        Self {
            text: text.into(),
            tool_requests,
            stop_reason: StopReason::ToolUse,
        }
    }
}

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model provider '{provider}' is not supported")]
    UnsupportedProvider { provider: String },
    #[error("provider '{provider}' requires an API key in ${env_var}")]
    MissingApiKey { provider: String, env_var: String },
    #[error("network error calling provider '{provider}': {source}")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider '{provider}' returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("provider '{provider}' did not respond within {after:?}")]
    Timeout { provider: String, after: Duration },
    #[error("provider '{provider}' returned invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl ModelError {
    pub fn network(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.into(),
            source,
        }
    }

    pub fn invalid_response(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ModelError::Status { status: 429, .. })
    }

    /// Operator-facing message
    pub fn user_message(&self) -> String {
        match self {
            ModelError::UnsupportedProvider { provider } => format!(
                "Model provider '{provider}' is not supported. Check [model].provider in deskpilot.toml."
            ),
            ModelError::MissingApiKey { env_var, .. } => {
                format!("Set {env_var} (or add it to config/.env) before running deskpilot.")
            }
            ModelError::Network { provider, source } => {
                if source.is_connect() {
                    format!("Cannot connect to model provider '{provider}'.")
                } else if source.is_timeout() {
                    format!("Request to '{provider}' timed out.")
                } else {
                    format!("Network error talking to '{provider}'.")
                }
            }
            ModelError::Status { provider, status, .. } => match status {
                429 => format!("'{provider}' is rate limiting requests. Try again shortly."),
                401 | 403 => format!("'{provider}' rejected the API key."),
                500..=599 => format!("'{provider}' is currently unavailable (HTTP {status})."),
                _ => format!("Request to '{provider}' failed with HTTP {status}."),
            },
            ModelError::Timeout { provider, after } => {
                format!("'{provider}' did not answer within {} seconds.", after.as_secs())
            }
            ModelError::InvalidResponse { provider, .. } => {
                format!("Response from '{provider}' could not be understood.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_recognised() {
        let err = ModelError::Status {
            provider: "anthropic".into(),
            status: 429,
            body: "slow down".into(),
        };
        assert!(err.is_rate_limited());
        assert!(err.user_message().contains("rate limiting"));
    }

    #[test]
    fn missing_key_names_the_variable() {
        let err = ModelError::MissingApiKey {
            provider: "anthropic".into(),
            env_var: "ANTHROPIC_API_KEY".into(),
        };
        assert!(err.to_string().contains("$ANTHROPIC_API_KEY"));
        assert!(err.user_message().starts_with("Set ANTHROPIC_API_KEY"));
    }
}

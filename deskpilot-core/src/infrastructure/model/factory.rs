//! Provider factory - creates clients from config

use super::clients::AnthropicClient;
use super::traits::ModelClient;
use super::types::ModelError;
use crate::config::ModelConfig;
use std::env;
use tracing::warn;

/// Resolve API key from environment variable
pub fn resolve_api_key(provider: &str, env_var: &str) -> Option<String> {
    let name = env_var.trim();
    if name.is_empty() {
        return None;
    }
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Ok(_) | Err(_) => {
            warn!(provider, env_var = name, "API key environment variable is not set");
            None
        }
    }
}

/// Factory for creating model clients from `[model]` settings.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Supported provider types: `anthropic` (alias `claude`).
    pub fn create(config: &ModelConfig) -> Result<Box<dyn ModelClient>, ModelError> {
        match config.provider.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Box::new(AnthropicClient::from_config(config)?)),
            other => Err(ModelError::UnsupportedProvider {
                provider: other.to_string(),
            }),
        }
    }
}

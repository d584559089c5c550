//! # Model Configuration
//!
//! Settings for the completion endpoint the agent talks to.
//!
//! ```toml
//! [model]
//! provider = "anthropic"
//! endpoint = "https://api.anthropic.com"
//! api_key_env = "ANTHROPIC_API_KEY"
//! model = "claude-sonnet-4-20250514"
//! max_tokens = 4096
//! temperature = 0.2
//! timeout_secs = 120
//! ```

use crate::constants::{
    DEFAULT_ANTHROPIC_ENDPOINT, DEFAULT_API_KEY_ENV, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL_TIMEOUT_SECS, DEFAULT_PROVIDER,
};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Provider type, selects the wire format ("anthropic").
    pub provider: String,
    pub endpoint: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            endpoint: DEFAULT_ANTHROPIC_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
        }
    }

    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawModelConfig {
    pub(crate) provider: Option<String>,
    pub(crate) endpoint: Option<String>,
    pub(crate) api_key_env: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) max_tokens: Option<u32>,
    pub(crate) temperature: Option<f32>,
    pub(crate) timeout_secs: Option<u64>,
}

impl RawModelConfig {
    pub(crate) fn into_config(self, model: String) -> ModelConfig {
        let defaults = ModelConfig::new(model);
        ModelConfig {
            provider: self
                .provider
                .map(|p| p.trim().to_ascii_lowercase())
                .unwrap_or(defaults.provider),
            endpoint: self
                .endpoint
                .map(|e| e.trim_end_matches('/').to_string())
                .unwrap_or(defaults.endpoint),
            api_key_env: self.api_key_env.unwrap_or(defaults.api_key_env),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature,
            timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            model: defaults.model,
        }
    }
}

use crate::config::AppConfig;
use crate::constants::{
    DEFAULT_HISTORY_WINDOW, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL_TIMEOUT_SECS,
};
use crate::infrastructure::model::GenerationParams;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStep {
    pub call_id: String,
    pub tool: String,
    pub input: Value,
    pub success: bool,
    /// Tool output shortened for display.
    pub output: String,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentStatus {
    Completed,
    LengthTruncated,
    MaxIterationsReached,
    Unexpected { stop_reason: String },
    Cancelled,
    Errored { message: String },
}

impl AgentStatus {
    /// True only when the model declared the task finished.
    pub fn is_complete(&self) -> bool {
        matches!(self, AgentStatus::Completed)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AgentStatus::Errored { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    pub session_id: String,
    pub response: String,
    pub iterations: usize,
    /// Every tool the model asked for, in request order, repeats included.
    pub tools_used: Vec<String>,
    pub steps: Vec<AgentStep>,
    #[serde(flatten)]
    pub status: AgentStatus,
    pub error: bool,
}

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub model: String,
    pub max_iterations: usize,
    pub history_window: usize,
    pub system_prompt: Option<String>,
    pub params: GenerationParams,
    pub model_timeout: Duration,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            history_window: DEFAULT_HISTORY_WINDOW,
            system_prompt: None,
            params: GenerationParams {
                max_tokens: DEFAULT_MAX_TOKENS,
                temperature: None,
            },
            model_timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
        }
    }
}

impl AgentOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.model.clone(),
            max_iterations: config.agent.max_iterations,
            history_window: config.agent.history_window,
            system_prompt: config.agent.system_prompt.clone(),
            params: GenerationParams {
                max_tokens: config.model.max_tokens,
                temperature: config.model.temperature,
            },
            model_timeout: config.model.timeout,
        }
    }
}

//! Agent loop, tool dispatch, and recovery settings.

use crate::constants::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_BASE_DELAY_MS, DEFAULT_HISTORY_WINDOW,
    DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_RETRIES, DEFAULT_TOOL_CONCURRENCY,
    DEFAULT_TOOL_TIMEOUT_SECS,
};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub max_iterations: usize,
    pub history_window: usize,
    /// Replaces the built-in desktop automation prompt when set.
    pub system_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            history_window: DEFAULT_HISTORY_WINDOW,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    pub timeout: Duration,
    pub max_concurrency: usize,
    /// Substrings marking a tool as read-only. Everything else is treated as
    /// UI-mutating and runs one at a time.
    pub read_only: Vec<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            max_concurrency: DEFAULT_TOOL_CONCURRENCY,
            read_only: Vec::new(),
        }
    }
}

impl ToolSettings {
    pub fn is_read_only(&self, identifier: &str) -> bool {
        let lowered = identifier.to_ascii_lowercase();
        self.read_only
            .iter()
            .any(|marker| lowered.contains(&marker.to_ascii_lowercase()))
    }
}

/// Primary tool and the alternates tried, in order, when it is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FallbackRule {
    pub primary: String,
    #[serde(default)]
    pub alternates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecoverySettings {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub fallbacks: Vec<FallbackRule>,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            fallbacks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawAgentSettings {
    pub(crate) max_iterations: Option<usize>,
    pub(crate) history_window: Option<usize>,
    pub(crate) system_prompt: Option<String>,
}

impl From<RawAgentSettings> for AgentSettings {
    fn from(raw: RawAgentSettings) -> Self {
        let defaults = AgentSettings::default();
        Self {
            max_iterations: raw.max_iterations.unwrap_or(defaults.max_iterations),
            history_window: raw.history_window.unwrap_or(defaults.history_window),
            system_prompt: raw
                .system_prompt
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawToolSettings {
    pub(crate) timeout_secs: Option<u64>,
    pub(crate) max_concurrency: Option<usize>,
    #[serde(default)]
    pub(crate) read_only: Vec<String>,
}

impl From<RawToolSettings> for ToolSettings {
    fn from(raw: RawToolSettings) -> Self {
        let defaults = ToolSettings::default();
        Self {
            timeout: raw
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_concurrency: raw.max_concurrency.unwrap_or(defaults.max_concurrency),
            read_only: raw.read_only,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawRecoverySettings {
    pub(crate) max_retries: Option<u32>,
    pub(crate) base_delay_ms: Option<u64>,
    pub(crate) backoff_factor: Option<f64>,
    #[serde(default)]
    pub(crate) fallbacks: Vec<FallbackRule>,
}

impl From<RawRecoverySettings> for RecoverySettings {
    fn from(raw: RawRecoverySettings) -> Self {
        let defaults = RecoverySettings::default();
        Self {
            max_retries: raw.max_retries.unwrap_or(defaults.max_retries),
            base_delay: raw
                .base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            backoff_factor: raw.backoff_factor.unwrap_or(defaults.backoff_factor),
            fallbacks: raw.fallbacks,
        }
    }
}

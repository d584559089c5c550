use super::CONFIG_PATH;
use super::error::ConfigError;
use super::model::RawModelConfig;
use super::runtime::{RawAgentSettings, RawRecoverySettings, RawToolSettings};
use super::server::{RawServer, ServerConfig};
use crate::constants::ENV_PATH;
use dotenvy::from_filename;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;
use tracing::debug;

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub model: RawModelConfig,
    #[serde(default)]
    pub agent: RawAgentSettings,
    #[serde(default)]
    pub tools: RawToolSettings,
    #[serde(default)]
    pub recovery: RawRecoverySettings,
    #[serde(default)]
    pub servers: Vec<RawServer>,
}

/// Ensures environment variables are loaded from config/.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename(ENV_PATH);
    });
}

/// Load and validate configuration from a file path
pub fn load_config(path: Option<&Path>) -> Result<super::AppConfig, ConfigError> {
    ensure_env_loaded();
    let config_path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));
    read_config(config_path)
}

fn read_config(path: &Path) -> Result<super::AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading deskpilot configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_config(&content, path)
}

pub(super) fn parse_config(content: &str, path: &Path) -> Result<super::AppConfig, ConfigError> {
    let parsed: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_and_build(parsed)
}

fn validate_and_build(parsed: RawConfig) -> Result<super::AppConfig, ConfigError> {
    let model_id = parsed
        .model
        .model
        .clone()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or(ConfigError::MissingModel)?;

    let mut seen = HashSet::new();
    for server in &parsed.servers {
        if server.command.trim().is_empty() {
            return Err(ConfigError::MissingCommand {
                server: server.name.clone(),
            });
        }
        if !seen.insert(server.name.clone()) {
            return Err(ConfigError::DuplicateServer {
                server: server.name.clone(),
            });
        }
    }

    let agent = super::AgentSettings::from(parsed.agent);
    if agent.max_iterations == 0 {
        return Err(ConfigError::ZeroLimit {
            field: "agent.max_iterations",
        });
    }
    if agent.history_window == 0 {
        return Err(ConfigError::ZeroLimit {
            field: "agent.history_window",
        });
    }

    let tools = super::ToolSettings::from(parsed.tools);
    if tools.max_concurrency == 0 {
        return Err(ConfigError::ZeroLimit {
            field: "tools.max_concurrency",
        });
    }

    let recovery = super::RecoverySettings::from(parsed.recovery);
    if !(recovery.backoff_factor > 0.0) {
        return Err(ConfigError::InvalidBackoff {
            value: recovery.backoff_factor,
        });
    }

    Ok(super::AppConfig {
        model: parsed.model.into_config(model_id),
        agent,
        tools,
        recovery,
        servers: parsed.servers.into_iter().map(ServerConfig::from).collect(),
    })
}

use super::error::ConfigError;
use super::model::ModelConfig;
use super::runtime::{AgentSettings, RecoverySettings, ToolSettings};
use super::server::ServerConfig;
use std::path::Path;

/// Application configuration loaded from deskpilot.toml
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub agent: AgentSettings,
    pub tools: ToolSettings,
    pub recovery: RecoverySettings,
    pub servers: Vec<ServerConfig>,
}

impl AppConfig {
    /// Load configuration from a file path (or default path if None)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    /// Parse configuration from TOML text without touching the filesystem.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        super::loader::parse_config(content, Path::new("<inline>"))
    }

    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|server| server.name == name)
    }
}

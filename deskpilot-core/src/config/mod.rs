pub mod app;
pub mod error;
pub mod loader;
pub mod model;
pub mod runtime;
pub mod server;

pub use crate::constants::CONFIG_PATH;
pub use app::AppConfig;
pub use error::ConfigError;
pub use loader::ensure_env_loaded;
pub use model::ModelConfig;
pub use runtime::{AgentSettings, FallbackRule, RecoverySettings, ToolSettings};
pub use server::ServerConfig;

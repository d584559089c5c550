use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing required field 'model.model' in configuration")]
    MissingModel,

    #[error("server '{server}' is missing a command")]
    MissingCommand { server: String },

    #[error("server name '{server}' is declared more than once")]
    DuplicateServer { server: String },

    #[error("'{field}' must be greater than zero")]
    ZeroLimit { field: &'static str },

    #[error("'recovery.backoff_factor' must be positive, got {value}")]
    InvalidBackoff { value: f64 },
}

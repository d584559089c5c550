//! Application constants
//!
//! Single source of truth for paths and default limits.

/// Default configuration file path
pub const CONFIG_PATH: &str = "config/deskpilot.toml";

/// Default environment file path
pub const ENV_PATH: &str = "config/.env";

pub const DEFAULT_PROVIDER: &str = "anthropic";
pub const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com";
pub const DEFAULT_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;

/// Model/tool round-trips allowed before a session is forced to stop.
pub const DEFAULT_MAX_ITERATIONS: usize = 25;
/// Messages retained after each turn.
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TOOL_CONCURRENCY: usize = 3;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// MCP revision announced during the `initialize` handshake.
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Tool identifiers must match `^[a-zA-Z0-9_-]{1,128}$` on the model side.
pub const MAX_TOOL_IDENTIFIER_LEN: usize = 128;

/// Characters of tool arguments kept when logging a dispatch.
pub const ARGUMENT_LOG_LIMIT: usize = 160;

/// Upper bound for each request of the MCP handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 30;

/// Extra wait past the tool timeout before the dispatcher abandons a
/// provider that ignores its own deadline.
pub const DISPATCH_GRACE_MS: u64 = 250;

//! # deskpilot-core
//!
//! Orchestration core of the deskpilot desktop automation agent. A language
//! model drives tools exposed by MCP servers (click, type, scroll, snapshot,
//! shell) and this crate runs the loop between the two.
//!
//! ## Layout
//!
//! - [`config`] - TOML configuration, validated into typed settings
//! - [`domain`] - conversation and tool invocation types shared by every layer
//! - [`tooling`] - provider connections, the tool registry, and the dispatcher
//! - [`recovery`] - error classification, fallbacks, retries, and workflows
//! - [`agent`] - conversation state and the agent loop
//! - [`model`] - the model client contract and the Anthropic implementation

pub mod application;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, recovery, tooling};
pub use config::{AppConfig, ConfigError};
pub use domain::types;
pub use infrastructure::model;

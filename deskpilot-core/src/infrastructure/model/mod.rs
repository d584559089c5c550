//! Model infrastructure module
//!
//! # Structure
//! - `types` - request, response, and error types
//! - `traits` - the `ModelClient` contract the agent loop calls
//! - `adapter` - conversation to Anthropic Messages conversion
//! - `factory` - builds a client from `[model]` settings
//! - `clients` - HTTP client implementations

pub mod adapter;
pub mod clients;
pub mod factory;
pub mod traits;
pub mod types;

pub use clients::AnthropicClient;
pub use factory::ProviderFactory;
pub use traits::ModelClient;
pub use types::{CompletionRequest, CompletionResponse, GenerationParams, ModelError};

//! Model traits

use super::types::{CompletionRequest, CompletionResponse, ModelError};
use async_trait::async_trait;

/// Completion endpoint used by the agent loop. Implementations do not retry;
/// every failure is returned as a `ModelError`.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Get the client ID
    fn id(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError>;
}

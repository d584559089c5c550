use super::registry::ToolRegistry;
use crate::config::ToolSettings;
use crate::constants::{ARGUMENT_LOG_LIMIT, DISPATCH_GRACE_MS};
use crate::domain::types::{
    FailureKind, ToolInvocationRequest, ToolInvocationResult, ToolPayload, summarise,
};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Turns one tool request into one result. Implementations never fail: every
/// error is folded into the returned result.
#[async_trait]
pub trait ToolDispatch: Send + Sync {
    async fn dispatch(&self, request: ToolInvocationRequest) -> ToolInvocationResult;
}

/// Routes requests through the registry to the owning provider.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    async fn route(&self, request: &ToolInvocationRequest) -> ToolInvocationResult {
        let resolved = match self.registry.resolve(&request.tool) {
            Ok(resolved) => resolved,
            Err(err) => {
                return ToolInvocationResult::failure(
                    &request.call_id,
                    &request.tool,
                    FailureKind::NotFound,
                    err.to_string(),
                    false,
                );
            }
        };

        let provider = match self.registry.provider_for(&request.tool, &resolved) {
            Ok(provider) => provider,
            Err(err) => {
                return ToolInvocationResult::failure(
                    &request.call_id,
                    &request.tool,
                    FailureKind::Unavailable,
                    err.to_string(),
                    false,
                )
                .with_origin(&resolved.provider_id);
            }
        };

        let call = provider.invoke(
            &resolved.original_name,
            request.arguments.clone(),
            self.timeout,
        );
        let backstop = self.timeout + Duration::from_millis(DISPATCH_GRACE_MS);
        let outcome = match tokio::time::timeout(backstop, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                return ToolInvocationResult::failure(
                    &request.call_id,
                    &request.tool,
                    FailureKind::Timeout,
                    format!("tool call timed out after {:?} (timeout)", self.timeout),
                    true,
                );
            }
        };

        match outcome {
            Ok(raw) => normalize_tool_result(&request.call_id, &request.tool, &raw),
            Err(err) => {
                let (kind, retryable) = err.classify();
                ToolInvocationResult::failure(
                    &request.call_id,
                    &request.tool,
                    kind,
                    err.detail(),
                    retryable,
                )
                .with_origin(err.server())
            }
        }
    }
}

#[async_trait]
impl ToolDispatch for ToolDispatcher {
    async fn dispatch(&self, request: ToolInvocationRequest) -> ToolInvocationResult {
        let arguments = summarise(&request.arguments.to_string(), ARGUMENT_LOG_LIMIT);
        info!(
            tool = %request.tool,
            call_id = %request.call_id,
            arguments = %arguments,
            "Dispatching tool call"
        );

        let result = self.route(&request).await;
        match result.failure_message() {
            None => info!(tool = %result.tool, call_id = %result.call_id, "Tool call succeeded"),
            Some(message) => warn!(
                tool = %result.tool,
                call_id = %result.call_id,
                kind = result.failure_kind().map(|k| k.as_str()).unwrap_or_default(),
                server = result.failure_origin().unwrap_or_default(),
                error = %summarise(message, ARGUMENT_LOG_LIMIT),
                "Tool call failed"
            ),
        }
        result
    }
}

/// Converts a raw `tools/call` result into the tagged result type.
///
/// Text blocks are joined; `structuredContent` is used when no text exists.
/// `isError: true` becomes an execution failure carrying the tool's message.
pub fn normalize_tool_result(call_id: &str, tool: &str, raw: &Value) -> ToolInvocationResult {
    let text = raw
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|text| !text.is_empty());
    let structured = raw.get("structuredContent").filter(|v| !v.is_null());

    if raw.get("isError").and_then(Value::as_bool).unwrap_or(false) {
        let message = structured
            .and_then(|s| s.get("error"))
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(text)
            .unwrap_or_else(|| "tool reported an error without a message".to_string());
        return ToolInvocationResult::failure(call_id, tool, FailureKind::Execution, message, true);
    }

    let payload = match (text, structured) {
        (Some(text), _) => ToolPayload::Text(text),
        (None, Some(value)) => ToolPayload::Structured(value.clone()),
        (None, None) if raw.is_string() => ToolPayload::Text(raw.as_str().unwrap_or_default().to_string()),
        (None, None) => ToolPayload::Structured(raw.clone()),
    };
    ToolInvocationResult::success(call_id, tool, payload)
}

/// Bounds sibling tool calls of one model response. Read-only tools share
/// the parallel permits; every other tool also takes the single exclusive
/// permit, so UI-mutating calls run one at a time in request order.
#[derive(Clone)]
pub struct ConcurrencyGate {
    parallel: Arc<Semaphore>,
    exclusive: Arc<Semaphore>,
    settings: Arc<ToolSettings>,
}

impl ConcurrencyGate {
    pub fn new(settings: ToolSettings) -> Self {
        Self {
            parallel: Arc::new(Semaphore::new(settings.max_concurrency.max(1))),
            exclusive: Arc::new(Semaphore::new(1)),
            settings: Arc::new(settings),
        }
    }

    /// Dispatches all requests and returns results in request order.
    pub async fn dispatch_batch(
        &self,
        dispatcher: &dyn ToolDispatch,
        requests: Vec<ToolInvocationRequest>,
    ) -> Vec<ToolInvocationResult> {
        let calls = requests.into_iter().map(|request| async move {
            let read_only = self.settings.is_read_only(&request.tool);
            let _exclusive = if read_only {
                None
            } else {
                self.exclusive.acquire().await.ok()
            };
            let _permit = self.parallel.acquire().await.ok();
            dispatcher.dispatch(request).await
        });
        join_all(calls).await
    }
}

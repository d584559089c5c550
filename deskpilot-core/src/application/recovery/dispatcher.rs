use super::classify::{ErrorCategory, classify_failure};
use super::policy::{FailureContext, RecoveryDecision, RecoveryPolicy};
use crate::application::tooling::ToolDispatch;
use crate::domain::types::{ToolInvocationRequest, ToolInvocationResult, ToolOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

const RECENT_ERRORS: usize = 5;

/// One failed attempt, kept for the session's error summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub call_id: String,
    pub tool: String,
    pub message: String,
    pub category: ErrorCategory,
    pub attempt: u32,
    pub decision: &'static str,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_tool: BTreeMap<String, usize>,
    pub recent: Vec<ErrorRecord>,
}

/// Decorates a dispatcher with retry, fallback, skip, and abort handling.
pub struct RecoveringDispatcher {
    inner: Arc<dyn ToolDispatch>,
    policy: RecoveryPolicy,
    history: Mutex<Vec<ErrorRecord>>,
}

impl RecoveringDispatcher {
    pub fn new(inner: Arc<dyn ToolDispatch>, policy: RecoveryPolicy) -> Self {
        Self {
            inner,
            policy,
            history: Mutex::new(Vec::new()),
        }
    }

    pub async fn error_history(&self) -> Vec<ErrorRecord> {
        self.history.lock().await.clone()
    }

    pub async fn error_summary(&self) -> ErrorSummary {
        let history = self.history.lock().await;
        let mut summary = ErrorSummary {
            total: history.len(),
            ..ErrorSummary::default()
        };
        for record in history.iter() {
            *summary
                .by_category
                .entry(record.category.as_str().to_string())
                .or_default() += 1;
            *summary.by_tool.entry(record.tool.clone()).or_default() += 1;
        }
        let skip = history.len().saturating_sub(RECENT_ERRORS);
        summary.recent = history[skip..].to_vec();
        summary
    }

    async fn record(&self, record: ErrorRecord) {
        self.history.lock().await.push(record);
    }
}

#[async_trait]
impl ToolDispatch for RecoveringDispatcher {
    async fn dispatch(&self, request: ToolInvocationRequest) -> ToolInvocationResult {
        let primary = request.clone();
        let mut current = request;
        let mut tried = vec![primary.tool.clone()];
        let mut retry_count = 0u32;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let result = self.inner.dispatch(current.clone()).await;
            let ToolOutcome::Failure {
                kind,
                message,
                retryable,
                ..
            } = &result.outcome
            else {
                if attempts > 1 {
                    info!(
                        tool = %current.tool,
                        primary = %primary.tool,
                        call_id = %current.call_id,
                        attempts,
                        "Tool call recovered"
                    );
                }
                return result;
            };

            let category = classify_failure(Some(*kind), message);
            let decision = self.policy.decide(&FailureContext {
                primary: &primary.tool,
                primary_arguments: &primary.arguments,
                tool: &current.tool,
                category,
                retryable: *retryable,
                retry_count,
                tried: &tried,
            });
            self.record(ErrorRecord {
                call_id: current.call_id.clone(),
                tool: current.tool.clone(),
                message: message.clone(),
                category,
                attempt: attempts,
                decision: decision.label(),
                at: Utc::now(),
            })
            .await;

            match decision {
                RecoveryDecision::Retry { delay } => {
                    retry_count += 1;
                    tokio::time::sleep(delay).await;
                }
                RecoveryDecision::Fallback { tool, arguments } => {
                    info!(
                        from = %current.tool,
                        to = %tool,
                        call_id = %current.call_id,
                        "Falling back to alternate tool"
                    );
                    tried.push(tool.clone());
                    current = primary.reroute(tool, arguments);
                    retry_count = 0;
                }
                RecoveryDecision::Skip => {
                    return annotate(
                        result,
                        format!("skipped after {attempts} attempt(s)"),
                    );
                }
                RecoveryDecision::Abort => {
                    warn!(
                        tool = %current.tool,
                        call_id = %current.call_id,
                        "Tool call aborted, not retrying"
                    );
                    return annotate(result, "aborted, not retried".to_string());
                }
            }
        }
    }
}

/// Final failure as the model sees it: recovery note appended and no longer
/// retryable.
fn annotate(result: ToolInvocationResult, note: String) -> ToolInvocationResult {
    match result.outcome {
        ToolOutcome::Failure {
            kind,
            message,
            origin,
            ..
        } => {
            let annotated = ToolInvocationResult::failure(
                result.call_id,
                result.tool,
                kind,
                format!("{message} [{note}]"),
                false,
            );
            match origin {
                Some(server) => annotated.with_origin(server),
                None => annotated,
            }
        }
        ToolOutcome::Success { .. } => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecoverySettings;
    use crate::domain::types::{FailureKind, ToolPayload};
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Replays scripted outcomes per tool and records every attempt.
    struct ScriptedDispatch {
        script: Mutex<BTreeMap<String, VecDeque<Result<String, String>>>>,
        attempts: Mutex<Vec<(String, Value)>>,
    }

    impl ScriptedDispatch {
        fn new(entries: Vec<(&str, Vec<Result<&str, &str>>)>) -> Arc<Self> {
            let script = entries
                .into_iter()
                .map(|(tool, outcomes)| {
                    let queue = outcomes
                        .into_iter()
                        .map(|o| o.map(str::to_string).map_err(str::to_string))
                        .collect();
                    (tool.to_string(), queue)
                })
                .collect();
            Arc::new(Self {
                script: Mutex::new(script),
                attempts: Mutex::new(Vec::new()),
            })
        }

        async fn attempts(&self) -> Vec<(String, Value)> {
            self.attempts.lock().await.clone()
        }
    }

    #[async_trait]
    impl ToolDispatch for ScriptedDispatch {
        async fn dispatch(&self, request: ToolInvocationRequest) -> ToolInvocationResult {
            self.attempts
                .lock()
                .await
                .push((request.tool.clone(), request.arguments.clone()));
            let next = self
                .script
                .lock()
                .await
                .get_mut(&request.tool)
                .and_then(VecDeque::pop_front)
                .unwrap_or(Ok("ok".to_string()));
            match next {
                Ok(text) => ToolInvocationResult::success(
                    request.call_id,
                    request.tool,
                    ToolPayload::Text(text),
                ),
                Err(message) => ToolInvocationResult::failure(
                    request.call_id,
                    request.tool,
                    FailureKind::Execution,
                    message,
                    true,
                ),
            }
        }
    }

    fn recovering(inner: Arc<ScriptedDispatch>) -> RecoveringDispatcher {
        RecoveringDispatcher::new(inner, RecoveryPolicy::new(&RecoverySettings::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn access_denied_is_dispatched_exactly_once() {
        let inner = ScriptedDispatch::new(vec![("Shell", vec![Err("Access denied: HKLM")])]);
        let dispatcher = recovering(Arc::clone(&inner));

        let result = dispatcher
            .dispatch(ToolInvocationRequest::new("c1", "Shell", json!({"command": "reg add"})))
            .await;

        assert_eq!(inner.attempts().await.len(), 1);
        assert!(!result.is_success());
        assert!(!result.is_retryable());
        assert!(result.failure_message().unwrap_or_default().contains("aborted"));

        let history = dispatcher.error_history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].category, ErrorCategory::Permission);
        assert_eq!(history[0].attempt, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn browser_not_found_falls_back_to_shell() {
        let inner = ScriptedDispatch::new(vec![
            ("browser", vec![Err("Chrome window not found")]),
            ("shell", vec![Ok("started")]),
        ]);
        let dispatcher = recovering(Arc::clone(&inner));

        let result = dispatcher
            .dispatch(ToolInvocationRequest::new("c2", "browser", json!({"url": "http://x"})))
            .await;

        assert!(result.is_success());
        assert_eq!(result.call_id, "c2");
        assert_eq!(
            inner.attempts().await,
            vec![
                ("browser".to_string(), json!({"url": "http://x"})),
                ("shell".to_string(), json!({"command": "start chrome http://x"})),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retry_with_backoff_then_skip() {
        let inner = ScriptedDispatch::new(vec![(
            "Click",
            vec![
                Err("connection reset"),
                Err("connection reset"),
                Err("connection reset"),
            ],
        )]);
        let dispatcher = recovering(Arc::clone(&inner));

        let started = tokio::time::Instant::now();
        let result = dispatcher
            .dispatch(ToolInvocationRequest::new("c3", "Click", json!({})))
            .await;

        assert_eq!(inner.attempts().await.len(), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(3000) && waited < Duration::from_millis(3100));
        assert!(result.failure_message().unwrap_or_default().contains("skipped after 3"));

        let summary = dispatcher.error_summary().await;
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_category.get("transient"), Some(&3));
        assert_eq!(summary.by_tool.get("Click"), Some(&3));
        assert_eq!(summary.recent.last().map(|r| r.decision), Some("skip"));
    }

    #[tokio::test(start_paused = true)]
    async fn unclassified_failure_retries_once() {
        let inner = ScriptedDispatch::new(vec![("Type", vec![Err("weird glitch"), Ok("typed")])]);
        let dispatcher = recovering(Arc::clone(&inner));

        let result = dispatcher
            .dispatch(ToolInvocationRequest::new("c4", "Type", json!({"text": "hi"})))
            .await;

        assert!(result.is_success());
        assert_eq!(inner.attempts().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn summary_keeps_only_recent_records() {
        let failures = vec![Err("weird"); 2];
        let inner = ScriptedDispatch::new(vec![
            ("a", failures.clone()),
            ("b", failures.clone()),
            ("c", failures),
        ]);
        let dispatcher = recovering(inner);
        for tool in ["a", "b", "c"] {
            dispatcher
                .dispatch(ToolInvocationRequest::new(tool, tool, json!({})))
                .await;
        }

        let summary = dispatcher.error_summary().await;
        assert_eq!(summary.total, 6);
        assert_eq!(summary.recent.len(), RECENT_ERRORS);
        assert_eq!(summary.recent[0].tool, "a");
        assert_eq!(summary.recent[4].tool, "c");
    }
}

use super::classify::ErrorCategory;
use super::fallback::FallbackTable;
use crate::config::RecoverySettings;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryDecision {
    Retry { delay: Duration },
    Fallback { tool: String, arguments: Value },
    Skip,
    Abort,
}

impl RecoveryDecision {
    pub fn label(&self) -> &'static str {
        match self {
            RecoveryDecision::Retry { .. } => "retry",
            RecoveryDecision::Fallback { .. } => "fallback",
            RecoveryDecision::Skip => "skip",
            RecoveryDecision::Abort => "abort",
        }
    }
}

/// Everything the policy looks at for one failed attempt.
#[derive(Debug, Clone)]
pub struct FailureContext<'a> {
    /// Tool the model originally asked for.
    pub primary: &'a str,
    pub primary_arguments: &'a Value,
    /// Tool of the failed attempt (the primary or a fallback).
    pub tool: &'a str,
    pub category: ErrorCategory,
    pub retryable: bool,
    /// Retries already spent on `tool`.
    pub retry_count: u32,
    /// Primary plus every alternate attempted so far.
    pub tried: &'a [String],
}

#[derive(Clone)]
pub struct RecoveryPolicy {
    max_retries: u32,
    base_delay: Duration,
    backoff_factor: f64,
    fallbacks: FallbackTable,
}

impl RecoveryPolicy {
    pub fn new(settings: &RecoverySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: settings.base_delay,
            backoff_factor: settings.backoff_factor,
            fallbacks: FallbackTable::from_rules(&settings.fallbacks),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let multiplier = self.backoff_factor.powi(exponent);
        let millis = (self.base_delay.as_millis() as f64 * multiplier)
            .clamp(0.0, u64::MAX as f64);
        Duration::from_millis(millis as u64)
    }

    pub fn decide(&self, failure: &FailureContext<'_>) -> RecoveryDecision {
        let decision = self.evaluate(failure);
        info!(
            tool = failure.tool,
            primary = failure.primary,
            category = %failure.category,
            retry_count = failure.retry_count,
            decision = decision.label(),
            "Recovery decision"
        );
        decision
    }

    fn evaluate(&self, failure: &FailureContext<'_>) -> RecoveryDecision {
        let can_retry = failure.retryable && failure.retry_count < self.max_retries;

        match failure.category {
            ErrorCategory::Permission => return RecoveryDecision::Abort,
            ErrorCategory::Transient if can_retry => {
                return RecoveryDecision::Retry {
                    delay: self.backoff_for_attempt(failure.retry_count + 1),
                };
            }
            ErrorCategory::Unavailable => {
                return match self.fallbacks.next_alternate(failure.primary, failure.tried) {
                    Some(alternate) => RecoveryDecision::Fallback {
                        tool: alternate.to_string(),
                        arguments: self.fallbacks.adapt(
                            failure.primary,
                            alternate,
                            failure.primary_arguments,
                        ),
                    },
                    None => RecoveryDecision::Skip,
                };
            }
            _ => {}
        }

        if failure.retry_count == 0 && can_retry {
            RecoveryDecision::Retry {
                delay: self.backoff_for_attempt(1),
            }
        } else {
            RecoveryDecision::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy() -> RecoveryPolicy {
        RecoveryPolicy::new(&RecoverySettings::default())
    }

    fn context<'a>(
        category: ErrorCategory,
        retry_count: u32,
        tried: &'a [String],
        arguments: &'a Value,
    ) -> FailureContext<'a> {
        FailureContext {
            primary: "browser",
            primary_arguments: arguments,
            tool: "browser",
            category,
            retryable: true,
            retry_count,
            tried,
        }
    }

    #[test]
    fn backoff_grows_geometrically() {
        let policy = policy();
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(4000));
    }

    #[test]
    fn permission_aborts_immediately() {
        let tried = vec!["browser".to_string()];
        let args = json!({});
        let decision = policy().decide(&context(ErrorCategory::Permission, 0, &tried, &args));
        assert_eq!(decision, RecoveryDecision::Abort);
    }

    #[test]
    fn transient_retries_up_to_the_limit_then_skips() {
        let tried = vec!["browser".to_string()];
        let args = json!({});
        let policy = policy();
        assert_eq!(
            policy.decide(&context(ErrorCategory::Transient, 0, &tried, &args)),
            RecoveryDecision::Retry { delay: Duration::from_millis(1000) }
        );
        assert_eq!(
            policy.decide(&context(ErrorCategory::Transient, 1, &tried, &args)),
            RecoveryDecision::Retry { delay: Duration::from_millis(2000) }
        );
        assert_eq!(
            policy.decide(&context(ErrorCategory::Transient, 2, &tried, &args)),
            RecoveryDecision::Skip
        );
    }

    #[test]
    fn unavailable_falls_back_with_adapted_arguments() {
        let tried = vec!["browser".to_string()];
        let args = json!({ "url": "http://x" });
        let decision = policy().decide(&context(ErrorCategory::Unavailable, 0, &tried, &args));
        assert_eq!(
            decision,
            RecoveryDecision::Fallback {
                tool: "shell".into(),
                arguments: json!({ "command": "start chrome http://x" }),
            }
        );
    }

    #[test]
    fn unavailable_without_alternates_skips() {
        let tried = vec!["browser".into(), "shell".into(), "app".into()];
        let args = json!({});
        assert_eq!(
            policy().decide(&context(ErrorCategory::Unavailable, 0, &tried, &args)),
            RecoveryDecision::Skip
        );
    }

    #[test]
    fn unclassified_retries_once_then_skips() {
        let tried = vec!["browser".to_string()];
        let args = json!({});
        let policy = policy();
        assert!(matches!(
            policy.decide(&context(ErrorCategory::Unclassified, 0, &tried, &args)),
            RecoveryDecision::Retry { .. }
        ));
        assert_eq!(
            policy.decide(&context(ErrorCategory::Unclassified, 1, &tried, &args)),
            RecoveryDecision::Skip
        );
    }

    #[test]
    fn non_retryable_failures_are_never_retried() {
        let tried = vec!["browser".to_string()];
        let args = json!({});
        let mut failure = context(ErrorCategory::Transient, 0, &tried, &args);
        failure.retryable = false;
        assert_eq!(policy().decide(&failure), RecoveryDecision::Skip);
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool call requested by the model in one assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    pub call_id: String,
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolInvocationRequest {
    pub fn new(call_id: impl Into<String>, tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool: tool.into(),
            arguments,
        }
    }

    /// Same call id, different target. Used when recovery reroutes a call.
    pub fn reroute(&self, tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: self.call_id.clone(),
            tool: tool.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Identifier unknown to the registry.
    NotFound,
    Timeout,
    Transport,
    /// Owning provider is terminated.
    Unavailable,
    /// JSON-RPC level error returned by the provider.
    Protocol,
    /// The tool ran and reported `isError`.
    Execution,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::Timeout => "timeout",
            FailureKind::Transport => "transport",
            FailureKind::Unavailable => "unavailable",
            FailureKind::Protocol => "protocol",
            FailureKind::Execution => "execution",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ToolPayload {
    Text(String),
    Structured(Value),
}

impl ToolPayload {
    pub fn to_text(&self) -> String {
        match self {
            ToolPayload::Text(text) => text.clone(),
            ToolPayload::Structured(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success {
        payload: ToolPayload,
    },
    Failure {
        kind: FailureKind,
        message: String,
        retryable: bool,
        /// Provider that reported the failure, shown to the model only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<String>,
    },
}

/// Outcome of one dispatched call. Produced once by the dispatcher and never
/// mutated after it is appended to the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub call_id: String,
    pub tool: String,
    pub outcome: ToolOutcome,
}

impl ToolInvocationResult {
    pub fn success(call_id: impl Into<String>, tool: impl Into<String>, payload: ToolPayload) -> Self {
        Self {
            call_id: call_id.into(),
            tool: tool.into(),
            outcome: ToolOutcome::Success { payload },
        }
    }

    pub fn failure(
        call_id: impl Into<String>,
        tool: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool: tool.into(),
            outcome: ToolOutcome::Failure {
                kind,
                message: message.into(),
                retryable,
                origin: None,
            },
        }
    }

    /// Attributes a failure to the provider that reported it.
    pub fn with_origin(mut self, provider: impl Into<String>) -> Self {
        if let ToolOutcome::Failure { origin, .. } = &mut self.outcome {
            *origin = Some(provider.into());
        }
        self
    }

    pub fn failure_origin(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Failure { origin, .. } => origin.as_deref(),
            ToolOutcome::Success { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            ToolOutcome::Failure { kind, .. } => Some(*kind),
            ToolOutcome::Success { .. } => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Failure { message, .. } => Some(message.as_str()),
            ToolOutcome::Success { .. } => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Failure { retryable: true, .. })
    }

    /// Text handed back to the model as the tool result content.
    pub fn content_text(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success { payload } => payload.to_text(),
            ToolOutcome::Failure {
                message,
                origin: Some(server),
                ..
            } => format!("Error executing {} (server '{server}'): {message}", self.tool),
            ToolOutcome::Failure { message, .. } => {
                format!("Error executing {}: {message}", self.tool)
            }
        }
    }
}

/// Why the model stopped generating in a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    LengthLimit,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ConversationMessage {
    User {
        text: String,
    },
    Assistant {
        text: String,
        #[serde(default)]
        tool_requests: Vec<ToolInvocationRequest>,
    },
    ToolResults {
        results: Vec<ToolInvocationResult>,
    },
}

impl ConversationMessage {
    pub fn user(text: impl Into<String>) -> Self {
        ConversationMessage::User { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>, tool_requests: Vec<ToolInvocationRequest>) -> Self {
        ConversationMessage::Assistant {
            text: text.into(),
            tool_requests,
        }
    }

    pub fn tool_results(results: Vec<ToolInvocationResult>) -> Self {
        ConversationMessage::ToolResults { results }
    }

    pub fn is_user_text(&self) -> bool {
        matches!(self, ConversationMessage::User { .. })
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, ConversationMessage::Assistant { .. })
    }

    pub fn requested_call_ids(&self) -> Vec<&str> {
        match self {
            ConversationMessage::Assistant { tool_requests, .. } => tool_requests
                .iter()
                .map(|request| request.call_id.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Tool entry as exposed to the model, without routing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Collapse whitespace and cut `text` to `limit` characters for log lines.
pub fn summarise(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "(empty)".to_string();
    }
    let single_line = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = single_line.chars();
    let mut result: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        result.push_str("...");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_content_names_the_tool() {
        let result =
            ToolInvocationResult::failure("c1", "Click", FailureKind::Timeout, "timed out", true);
        assert_eq!(result.content_text(), "Error executing Click: timed out");
        assert!(result.is_retryable());
        assert_eq!(result.failure_kind(), Some(FailureKind::Timeout));
    }

    #[test]
    fn failure_origin_is_shown_but_not_part_of_message() {
        let result = ToolInvocationResult::failure(
            "c1",
            "Click",
            FailureKind::Protocol,
            "Invalid params",
            false,
        )
        .with_origin("network-tools");
        assert_eq!(result.failure_message(), Some("Invalid params"));
        assert_eq!(
            result.content_text(),
            "Error executing Click (server 'network-tools'): Invalid params"
        );
    }

    #[test]
    fn structured_payload_is_rendered_as_json() {
        let result = ToolInvocationResult::success(
            "c2",
            "Snapshot",
            ToolPayload::Structured(json!({"windows": 3})),
        );
        assert_eq!(result.content_text(), r#"{"windows":3}"#);
        assert!(!result.is_retryable());
    }

    #[test]
    fn summarise_truncates_and_flattens() {
        assert_eq!(summarise("  a\n b  ", 10), "a b");
        assert_eq!(summarise("abcdef", 3), "abc...");
        assert_eq!(summarise("   ", 3), "(empty)");
    }

    #[test]
    fn reroute_keeps_call_id() {
        let request = ToolInvocationRequest::new("c9", "browser", json!({"url": "http://x"}));
        let rerouted = request.reroute("shell", json!({"command": "dir"}));
        assert_eq!(rerouted.call_id, "c9");
        assert_eq!(rerouted.tool, "shell");
    }
}

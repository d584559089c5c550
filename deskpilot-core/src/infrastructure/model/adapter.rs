//! Conversation <-> Anthropic Messages conversion

use crate::domain::types::{ConversationMessage, StopReason, ToolInvocationRequest, ToolSchema};
use serde_json::{Value, json};

/// Placeholder for assistant turns that carried neither text nor tool calls.
const EMPTY_ASSISTANT_TEXT: &str = "(no response)";

pub struct MessageAdapter;

impl MessageAdapter {
    /// Converts the conversation to Messages API turns. Consecutive turns of
    /// the same role are merged so roles strictly alternate.
    pub fn to_anthropic_messages(messages: &[ConversationMessage]) -> Vec<Value> {
        let mut turns: Vec<(&'static str, Vec<Value>)> = Vec::new();
        for message in messages {
            let (role, blocks) = match message {
                ConversationMessage::User { text } => {
                    ("user", vec![json!({ "type": "text", "text": text })])
                }
                ConversationMessage::Assistant {
                    text,
                    tool_requests,
                } => {
                    let mut blocks = Vec::new();
                    if !text.trim().is_empty() {
                        blocks.push(json!({ "type": "text", "text": text }));
                    }
                    for request in tool_requests {
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": request.call_id,
                            "name": request.tool,
                            "input": match &request.arguments {
                                Value::Object(_) => request.arguments.clone(),
                                _ => json!({}),
                            },
                        }));
                    }
                    if blocks.is_empty() {
                        blocks.push(json!({ "type": "text", "text": EMPTY_ASSISTANT_TEXT }));
                    }
                    ("assistant", blocks)
                }
                ConversationMessage::ToolResults { results } => {
                    let blocks = results
                        .iter()
                        .map(|result| {
                            json!({
                                "type": "tool_result",
                                "tool_use_id": result.call_id,
                                "content": result.content_text(),
                                "is_error": !result.is_success(),
                            })
                        })
                        .collect();
                    ("user", blocks)
                }
            };

            match turns.last_mut() {
                Some((last_role, last_blocks)) if *last_role == role => {
                    last_blocks.extend(blocks)
                }
                _ => turns.push((role, blocks)),
            }
        }

        turns
            .into_iter()
            .map(|(role, content)| json!({ "role": role, "content": content }))
            .collect()
    }

    pub fn to_anthropic_tools(tools: &[ToolSchema]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.input_schema,
                })
            })
            .collect()
    }

    /// Text blocks joined with newlines plus every `tool_use` block.
    pub fn from_anthropic_content(content: &[Value]) -> (String, Vec<ToolInvocationRequest>) {
        let mut texts = Vec::new();
        let mut requests = Vec::new();
        for block in content {
            match block.get("type").and_then(Value::as_str) {
                Some("text") => {
                    if let Some(text) = block.get("text").and_then(Value::as_str) {
                        texts.push(text.to_string());
                    }
                }
                Some("tool_use") => {
                    let id = block.get("id").and_then(Value::as_str);
                    let name = block.get("name").and_then(Value::as_str);
                    if let (Some(id), Some(name)) = (id, name) {
                        let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                        requests.push(ToolInvocationRequest::new(id, name, input));
                    }
                }
                _ => {}
            }
        }
        (texts.join("\n"), requests)
    }

    pub fn stop_reason(raw: Option<&str>) -> StopReason {
        match raw {
            Some("end_turn") | Some("stop_sequence") => StopReason::EndTurn,
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::LengthLimit,
            Some(other) => StopReason::Other(other.to_string()),
            None => StopReason::Other("missing".to_string()),
        }
    }
}

//! Rolling conversation state.
//!
//! Well-formed history: every `ToolResults` message directly follows the
//! `Assistant` message that requested exactly those call ids, and every
//! assistant message with requests is followed by its results.

use super::errors::AgentError;
use crate::domain::types::ConversationMessage;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
}

impl Conversation {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            messages: vec![ConversationMessage::user(task)],
        }
    }

    pub fn from_messages(messages: Vec<ConversationMessage>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    /// Keeps roughly the last `window` messages. The cut is moved backward
    /// from the retention boundary to the nearest user turn or assistant
    /// turn, so a request is never separated from its results. When the cut
    /// lands on an assistant turn the opening user message is kept in front.
    ///
    /// Returns the number of messages dropped.
    pub fn prune(&mut self, window: usize) -> usize {
        let len = self.messages.len();
        if window == 0 || len <= window {
            return 0;
        }
        let boundary = len - window;
        let Some(cut) = (1..=boundary).rev().find(|&i| {
            let message = &self.messages[i];
            message.is_user_text() || message.is_assistant()
        }) else {
            return 0;
        };

        let keep_opening = !self.messages[cut].is_user_text() && self.messages[0].is_user_text();
        let mut retained = Vec::with_capacity(len - cut + 1);
        if keep_opening {
            retained.push(self.messages[0].clone());
        }
        retained.extend(self.messages.drain(cut..));
        let dropped = len - retained.len();
        self.messages = retained;
        if dropped > 0 {
            debug!(dropped, retained = self.messages.len(), "Pruned conversation history");
        }
        dropped
    }

    /// Truncates the history to its longest well-formed prefix. Fails only
    /// when nothing would remain.
    pub fn repair(&mut self) -> Result<usize, AgentError> {
        let Some(violation) = first_violation(&self.messages) else {
            return Ok(0);
        };
        let removed = self.messages.len() - violation;
        warn!(
            at = violation,
            removed, "Conversation history malformed, truncating to last consistent prefix"
        );
        self.messages.truncate(violation);
        if self.messages.is_empty() {
            return Err(AgentError::ConversationCorrupted {
                reason: "no well-formed prefix remains".to_string(),
            });
        }
        Ok(removed)
    }

    pub fn is_well_formed(&self) -> bool {
        first_violation(&self.messages).is_none()
    }
}

fn sorted_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut ids: Vec<&str> = ids.collect();
    ids.sort_unstable();
    ids
}

/// Index of the first message that breaks request/result pairing.
fn first_violation(messages: &[ConversationMessage]) -> Option<usize> {
    for (index, message) in messages.iter().enumerate() {
        match message {
            ConversationMessage::ToolResults { results } => {
                let returned = sorted_ids(results.iter().map(|r| r.call_id.as_str()));
                let requested = match index.checked_sub(1).map(|i| &messages[i]) {
                    Some(previous @ ConversationMessage::Assistant { .. }) => {
                        sorted_ids(previous.requested_call_ids().into_iter())
                    }
                    _ => return Some(index),
                };
                if returned.is_empty() || returned != requested {
                    // the assistant turn is unusable without its results
                    return Some(index - 1);
                }
            }
            ConversationMessage::Assistant { tool_requests, .. } if !tool_requests.is_empty() => {
                let answered = matches!(
                    messages.get(index + 1),
                    Some(ConversationMessage::ToolResults { .. })
                );
                if !answered {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

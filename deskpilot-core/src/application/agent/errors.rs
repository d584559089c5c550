use crate::infrastructure::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("conversation history is corrupted beyond repair: {reason}")]
    ConversationCorrupted { reason: String },
    #[error("task is empty")]
    EmptyTask,
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Model(err) => err.user_message(),
            AgentError::ConversationCorrupted { .. } => {
                "The conversation history became inconsistent and had to be abandoned.".to_string()
            }
            AgentError::EmptyTask => "Describe the task to perform.".to_string(),
        }
    }
}

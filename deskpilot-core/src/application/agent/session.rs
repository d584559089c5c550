use super::conversation::Conversation;
use super::models::AgentStep;
use crate::domain::types::ToolSchema;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Cooperative stop signal, checked between iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State owned by a single task run. The tool catalog is shared read-only
/// with every other session built from the same registry.
#[derive(Debug)]
pub struct AgentSession {
    pub(crate) id: String,
    pub(crate) catalog: Arc<[ToolSchema]>,
    pub(crate) conversation: Conversation,
    pub(crate) steps: Vec<AgentStep>,
    pub(crate) tools_used: Vec<String>,
    pub(crate) iterations: usize,
    pub(crate) last_text: String,
}

impl AgentSession {
    pub fn new(task: impl Into<String>, catalog: Arc<[ToolSchema]>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            catalog,
            conversation: Conversation::new(task),
            steps: Vec::new(),
            tools_used: Vec::new(),
            iterations: 0,
            last_text: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn catalog(&self) -> &[ToolSchema] {
        &self.catalog
    }
}

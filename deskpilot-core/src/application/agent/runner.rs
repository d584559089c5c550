use super::errors::AgentError;
use super::instructions::compose_system_prompt;
use super::models::{AgentOptions, AgentOutcome, AgentStatus, AgentStep};
use super::session::{AgentSession, CancelFlag};
use crate::application::tooling::{ConcurrencyGate, ToolDispatch};
use crate::config::ToolSettings;
use crate::domain::types::{
    ConversationMessage, StopReason, ToolInvocationRequest, ToolInvocationResult, ToolSchema,
    summarise,
};
use crate::infrastructure::model::{CompletionRequest, CompletionResponse, ModelClient, ModelError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const TRUNCATION_MARKER: &str = "\n\n[Response truncated - max tokens reached]";
pub const MAX_ITERATIONS_MESSAGE: &str = "Maximum iterations reached. Task may be incomplete.";

const STEP_OUTPUT_LIMIT: usize = 200;

pub struct Agent {
    model: Arc<dyn ModelClient>,
    dispatcher: Arc<dyn ToolDispatch>,
    gate: ConcurrencyGate,
    catalog: Arc<[ToolSchema]>,
    guidance: Vec<(String, String)>,
    options: AgentOptions,
}

impl Agent {
    pub fn new(
        model: Arc<dyn ModelClient>,
        dispatcher: Arc<dyn ToolDispatch>,
        catalog: Vec<ToolSchema>,
        options: AgentOptions,
    ) -> Self {
        Self {
            model,
            dispatcher,
            gate: ConcurrencyGate::new(ToolSettings::default()),
            catalog: catalog.into(),
            guidance: Vec::new(),
            options,
        }
    }

    pub fn with_tool_settings(mut self, settings: ToolSettings) -> Self {
        self.gate = ConcurrencyGate::new(settings);
        self
    }

    /// Provider guidance as (server, text), appended to the system prompt.
    pub fn with_guidance(mut self, guidance: Vec<(String, String)>) -> Self {
        self.guidance = guidance;
        self
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub fn system_prompt(&self) -> String {
        compose_system_prompt(self.options.system_prompt.as_deref(), &self.guidance)
    }

    pub async fn run(&self, task: impl Into<String>) -> AgentOutcome {
        self.run_with_cancel(task, CancelFlag::new()).await
    }

    /// Runs one task to completion. Always yields an outcome; failures are
    /// reported through its status.
    pub async fn run_with_cancel(&self, task: impl Into<String>, cancel: CancelFlag) -> AgentOutcome {
        let task = task.into();
        let mut session = AgentSession::new(task.trim(), Arc::clone(&self.catalog));
        info!(
            session_id = %session.id,
            tools = session.catalog.len(),
            "Agent run started"
        );

        if task.trim().is_empty() {
            return finish(session, AgentStatus::Errored {
                message: AgentError::EmptyTask.user_message(),
            });
        }

        let system_prompt = self.system_prompt();
        let status = loop {
            if cancel.is_cancelled() {
                info!(session_id = %session.id, "Agent run cancelled");
                break AgentStatus::Cancelled;
            }
            if session.iterations >= self.options.max_iterations {
                warn!(
                    session_id = %session.id,
                    iterations = session.iterations,
                    "Agent reached the iteration limit"
                );
                break AgentStatus::MaxIterationsReached;
            }
            session.iterations += 1;

            if let Err(err) = session.conversation.repair() {
                error!(session_id = %session.id, %err, "Conversation could not be repaired");
                break AgentStatus::Errored {
                    message: err.user_message(),
                };
            }

            let response = match self.complete(&session, &system_prompt).await {
                Ok(response) => response,
                Err(err) => {
                    error!(session_id = %session.id, %err, "Model call failed");
                    break AgentStatus::Errored {
                        message: AgentError::from(err).user_message(),
                    };
                }
            };
            let CompletionResponse {
                text,
                tool_requests,
                stop_reason,
            } = response;
            if !text.trim().is_empty() {
                session.last_text = text.clone();
            }

            match stop_reason {
                StopReason::EndTurn => {
                    session
                        .conversation
                        .push(ConversationMessage::assistant(text, Vec::new()));
                    break AgentStatus::Completed;
                }
                StopReason::LengthLimit => {
                    session.last_text = text.clone();
                    session
                        .conversation
                        .push(ConversationMessage::assistant(text, Vec::new()));
                    break AgentStatus::LengthTruncated;
                }
                StopReason::ToolUse if !tool_requests.is_empty() => {
                    self.execute_tools(&mut session, text, tool_requests).await;
                    session.conversation.prune(self.options.history_window);
                }
                other => {
                    let stop_reason = match other {
                        StopReason::Other(reason) => reason,
                        _ => "tool_use without tool requests".to_string(),
                    };
                    error!(
                        session_id = %session.id,
                        stop_reason = %stop_reason,
                        "Unexpected stop reason"
                    );
                    session
                        .conversation
                        .push(ConversationMessage::assistant(text, Vec::new()));
                    break AgentStatus::Unexpected { stop_reason };
                }
            }
        };

        finish(session, status)
    }

    async fn complete(
        &self,
        session: &AgentSession,
        system_prompt: &str,
    ) -> Result<CompletionResponse, ModelError> {
        let request = CompletionRequest {
            model: self.options.model.clone(),
            system_prompt: system_prompt.to_string(),
            messages: session.conversation.messages().to_vec(),
            tools: session.catalog.to_vec(),
            params: self.options.params,
        };
        debug!(
            session_id = %session.id,
            iteration = session.iterations,
            messages = request.messages.len(),
            "Submitting turn to model"
        );
        let limit = self.options.model_timeout;
        match tokio::time::timeout(limit, self.model.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout {
                provider: self.model.id().to_string(),
                after: limit,
            }),
        }
    }

    async fn execute_tools(
        &self,
        session: &mut AgentSession,
        text: String,
        requests: Vec<ToolInvocationRequest>,
    ) {
        session
            .tools_used
            .extend(requests.iter().map(|request| request.tool.clone()));
        info!(
            session_id = %session.id,
            iteration = session.iterations,
            tools = ?requests.iter().map(|r| r.tool.as_str()).collect::<Vec<_>>(),
            "Model requested tools"
        );
        session
            .conversation
            .push(ConversationMessage::assistant(text, requests.clone()));

        let results = self
            .gate
            .dispatch_batch(self.dispatcher.as_ref(), requests.clone())
            .await;
        session
            .steps
            .extend(requests.iter().zip(&results).map(|(request, result)| step(request, result)));
        session
            .conversation
            .push(ConversationMessage::tool_results(results));
    }
}

fn step(request: &ToolInvocationRequest, result: &ToolInvocationResult) -> AgentStep {
    AgentStep {
        call_id: request.call_id.clone(),
        tool: request.tool.clone(),
        input: request.arguments.clone(),
        success: result.is_success(),
        output: summarise(&result.content_text(), STEP_OUTPUT_LIMIT),
    }
}

fn finish(session: AgentSession, status: AgentStatus) -> AgentOutcome {
    let response = match &status {
        AgentStatus::LengthTruncated => format!("{}{}", session.last_text, TRUNCATION_MARKER),
        AgentStatus::MaxIterationsReached if session.last_text.trim().is_empty() => {
            MAX_ITERATIONS_MESSAGE.to_string()
        }
        _ => session.last_text.clone(),
    };
    info!(
        session_id = %session.id,
        iterations = session.iterations,
        tool_calls = session.tools_used.len(),
        status = ?status,
        "Agent run finished"
    );
    AgentOutcome {
        session_id: session.id,
        response,
        iterations: session.iterations,
        tools_used: session.tools_used,
        steps: session.steps,
        error: status.is_error(),
        status,
    }
}

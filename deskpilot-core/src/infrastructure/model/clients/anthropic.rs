//! Anthropic Messages API client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::config::ModelConfig;
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::factory::resolve_api_key;
use crate::infrastructure::model::traits::ModelClient;
use crate::infrastructure::model::types::{CompletionRequest, CompletionResponse, ModelError};

const API_PATH: &str = "/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicClient {
    base: HttpClientBase,
    api_key_env: String,
}

impl AnthropicClient {
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        let api_key = resolve_api_key(&config.provider, &config.api_key_env);
        Ok(Self {
            base: HttpClientBase::new(
                config.provider.clone(),
                config.endpoint.clone(),
                api_key,
                config.timeout,
            )?,
            api_key_env: config.api_key_env.clone(),
        })
    }

    fn build_payload(request: &CompletionRequest) -> AnthropicRequest {
        AnthropicRequest {
            model: request.model.clone(),
            max_tokens: request.params.max_tokens,
            system: (!request.system_prompt.trim().is_empty())
                .then(|| request.system_prompt.clone()),
            messages: MessageAdapter::to_anthropic_messages(&request.messages),
            tools: MessageAdapter::to_anthropic_tools(&request.tools),
            temperature: request.params.temperature,
        }
    }

    fn parse_response(&self, response: AnthropicResponse) -> Result<CompletionResponse, ModelError> {
        if response.content.is_empty() && response.stop_reason.is_none() {
            return Err(ModelError::invalid_response(
                &self.base.id,
                "response has neither content nor stop_reason",
            ));
        }
        let (text, tool_requests) = MessageAdapter::from_anthropic_content(&response.content);
        Ok(CompletionResponse {
            text,
            tool_requests,
            stop_reason: MessageAdapter::stop_reason(response.stop_reason.as_deref()),
        })
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn id(&self) -> &str {
        &self.base.id
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError> {
        let api_key = self.base.require_api_key(&self.api_key_env)?;
        let url = self.base.build_url(API_PATH);
        let payload = Self::build_payload(&request);

        info!(
            provider = self.base.id.as_str(),
            model = request.model.as_str(),
            messages = payload.messages.len(),
            tools = payload.tools.len(),
            "Sending request to Anthropic"
        );

        let response: AnthropicResponse = self
            .base
            .post_json(
                &url,
                &[("x-api-key", api_key), ("anthropic-version", API_VERSION)],
                &payload,
            )
            .await?;
        debug!(stop_reason = ?response.stop_reason, "Received response from Anthropic");

        self.parse_response(response)
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<Value>,
    stop_reason: Option<String>,
}

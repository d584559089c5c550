//! Base HTTP client with shared logic

use crate::infrastructure::model::types::ModelError;
use crate::domain::types::summarise;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const ERROR_BODY_LIMIT: usize = 300;

/// Base HTTP client with shared functionality
#[derive(Clone)]
pub struct HttpClientBase {
    pub id: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub http: Client,
}

impl HttpClientBase {
    pub fn new(
        id: String,
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::network(&id, e))?;
        Ok(Self {
            id,
            endpoint,
            api_key,
            timeout,
            http,
        })
    }

    /// Build URL from endpoint and path
    pub fn build_url(&self, path: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Post JSON with extra headers. Non-success statuses become
    /// `ModelError::Status` carrying a trimmed response body.
    pub async fn post_json<Req, Res>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Req,
    ) -> Result<Res, ModelError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(url)
            .header("content-type", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                provider: self.id.clone(),
                status: status.as_u16(),
                body: summarise(&text, ERROR_BODY_LIMIT),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::invalid_response(&self.id, e.to_string()))
    }

    fn send_error(&self, source: reqwest::Error) -> ModelError {
        if source.is_timeout() {
            ModelError::Timeout {
                provider: self.id.clone(),
                after: self.timeout,
            }
        } else {
            ModelError::network(&self.id, source)
        }
    }

    pub fn require_api_key(&self, env_var: &str) -> Result<&str, ModelError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ModelError::MissingApiKey {
                provider: self.id.clone(),
                env_var: env_var.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_endpoint_and_path_with_single_slash() {
        let base = HttpClientBase::new(
            "anthropic".into(),
            "https://api.anthropic.com/".into(),
            None,
            Duration::from_secs(5),
        )
        .expect("client builds");
        assert_eq!(base.build_url("/v1/messages"), "https://api.anthropic.com/v1/messages");
        assert!(matches!(
            base.require_api_key("ANTHROPIC_API_KEY"),
            Err(ModelError::MissingApiKey { .. })
        ));
    }
}

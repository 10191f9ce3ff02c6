//! Messages API client with retry on transient failures.

use super::{
    Backoff, Message, MessageRequest, MessageResponse, ModelClient, ModelError, ToolChoice,
    ToolDefinition,
};
use crate::config::ModelSettings;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

const API_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: Backoff,
}

impl AnthropicClient {
    /// Create a client from settings, reading the API key from the environment.
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        let api_key = settings.api_key()?;
        Self::with_api_key(settings, api_key)
    }

    /// Create a client with an explicit API key.
    pub fn with_api_key(settings: &ModelSettings, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            retry: Backoff::new(settings.max_retries),
        })
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: Backoff) -> Self {
        self.retry = retry;
        self
    }

    /// Build the request body for one call.
    pub fn build_request(
        &self,
        system: &str,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> MessageRequest {
        let tools = tools.filter(|t| !t.is_empty());
        MessageRequest {
            model: self.model.clone(),
            system: system.to_string(),
            messages: messages.to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tool_choice: tools.map(|_| ToolChoice::Auto),
            tools: tools.map(|t| t.to_vec()),
        }
    }

    async fn send_once(
        &self,
        request: &MessageRequest,
    ) -> std::result::Result<MessageResponse, ModelError> {
        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(e.to_string())
                } else {
                    ModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<MessageResponse>()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len(), tools = tools.is_some()))]
    async fn call(
        &self,
        system: &str,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> std::result::Result<MessageResponse, ModelError> {
        let request = self.build_request(system, messages, tools);
        let response = self
            .retry
            .run(|| self.send_once(&request), ModelError::is_transient)
            .await?;

        debug!(
            "Model responded with {} blocks (stop_reason: {:?})",
            response.content.len(),
            response.stop_reason
        );
        Ok(response)
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

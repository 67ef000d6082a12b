use crate::config::LlmConfig;
use crate::errors::AgentError;
use crate::llm::{ByteStream, ChatMessage, StreamingLLM};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Client for any OpenAI-compatible `/chat/completions` endpoint with
/// `stream: true`.
#[derive(Debug, Clone)]
pub struct OpenAIStreamClient {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAIStreamClient {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            model,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        let mut client = Self::new(config.auth.resolved_api_key(), config.model.clone())
            .with_api_base(config.api_base.clone());

        if config.parameters.temperature >= 0.0 {
            client = client.with_temperature(config.parameters.temperature);
        }
        if config.parameters.max_tokens > 0 {
            client = client.with_max_tokens(config.parameters.max_tokens);
        }
        client
    }

    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn api_key(&self) -> Result<&str, AgentError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(AgentError::ConfigError(
                "No API key configured for the LLM provider. Set api_key or api_key_env".to_string(),
            )),
        }
    }

    fn build_request_body(&self, messages: &[ChatMessage]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        if let Some(temp) = self.temperature {
            body["temperature"] = temp.into();
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }

        body
    }
}

#[async_trait]
impl StreamingLLM for OpenAIStreamClient {
    fn validate(&self) -> Result<(), AgentError> {
        self.api_key().map(|_| ())
    }

    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<ByteStream, AgentError> {
        let api_key = self.api_key()?;

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request_body(&messages);
        log::debug!("Streaming request to {} with {} messages", url, messages.len());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::TransportError(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error while reading error response body".to_string());
            return Err(AgentError::TransportError(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| AgentError::TransportError(format!("Failed to read stream: {}", e)))
        });

        Ok(Box::pin(stream))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

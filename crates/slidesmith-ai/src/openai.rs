//! OpenAI provider implementation.
//!
//! Talks to the chat-completions endpoint with a system message (the deck
//! constraints) and a user message (the deck description).

use crate::AiError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use slidesmith_core::provider::{strip_code_fences, CompletionRequest, CompletionResponse};
use slidesmith_core::{AiProvider, ProviderConfig, Result, SlidesmithError};
use tracing::{debug, instrument};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI provider for deck generation.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
}

/// OpenAI chat completion request.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Chat message.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
        }
    }
}

/// OpenAI chat completion response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider with the given configuration.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let timeout = config.timeout_seconds.unwrap_or(120);
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout))
            .build()
            .map_err(|e| SlidesmithError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create a provider from `SLIDESMITH_*` environment variables.
    ///
    /// The API key is not read here; it is resolved per request.
    pub fn from_env() -> Result<Self> {
        Self::new(ProviderConfig::from_env())
    }

    /// Create a provider from environment with a specific model.
    pub fn from_env_with_model(model: &str) -> Result<Self> {
        let mut config = ProviderConfig::from_env();
        config.model = model.to_string();
        Self::new(config)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn send(&self, request: &CompletionRequest) -> std::result::Result<ChatResponse, AiError> {
        let api_request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage::new("system", &request.prompt.system),
                ChatMessage::new("user", &request.prompt.user),
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL);

        let response = self
            .client
            .post(url)
            .bearer_auth(request.api_key.expose())
            .json(&api_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::from_status(status, body));
        }

        response.json().await.map_err(|e| AiError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %self.config.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Requesting completion from OpenAI");

        let chat_response = self.send(&request).await?;

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| strip_code_fences(&c))
            .unwrap_or_default();

        if text.is_empty() {
            return Err(SlidesmithError::EmptyResponse);
        }

        let tokens_used = chat_response.usage.map(|u| u.total_tokens);
        debug!("Received {} chars ({:?} tokens)", text.len(), tokens_used);

        Ok(CompletionResponse { text, tokens_used })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage::new("system", "rules"), ChatMessage::new("user", "cats")],
            max_tokens: None,
            temperature: Some(0.2),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "cats");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_null_content_parses() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
        assert!(parsed.usage.is_none());
    }
}

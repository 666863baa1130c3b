//! AI Provider trait and configuration.
//!
//! Defines the interface that language-model backends must implement.

use crate::{ApiKey, PromptPair, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for an AI provider.
///
/// The credential is not part of the configuration; it travels with each
/// [`CompletionRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model identifier (e.g., "gpt-4o").
    pub model: String,

    /// Full URL of the chat-completions endpoint.
    pub base_url: Option<String>,

    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,

    /// Temperature for generation (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Request timeout in seconds.
    pub timeout_seconds: Option<u64>,
}

impl ProviderConfig {
    /// Create a new provider config for a model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: None,
            max_tokens: None,
            temperature: None,
            timeout_seconds: None,
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set max tokens.
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp.clamp(0.0, 2.0));
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Load config from environment variables.
    ///
    /// Expected variables:
    /// - `SLIDESMITH_MODEL` (defaults to "gpt-4o")
    /// - `SLIDESMITH_BASE_URL` (optional)
    /// - `SLIDESMITH_TEMPERATURE` (optional)
    /// - `SLIDESMITH_MAX_TOKENS` (optional)
    /// - `SLIDESMITH_PROVIDER_TIMEOUT` (optional, seconds)
    pub fn from_env() -> Self {
        let model = std::env::var("SLIDESMITH_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let mut config = Self::new(model);

        if let Ok(url) = std::env::var("SLIDESMITH_BASE_URL") {
            config = config.with_base_url(url);
        }
        if let Some(t) = std::env::var("SLIDESMITH_TEMPERATURE").ok().and_then(|v| v.parse().ok()) {
            config = config.with_temperature(t);
        }
        if let Some(n) = std::env::var("SLIDESMITH_MAX_TOKENS").ok().and_then(|v| v.parse().ok()) {
            config = config.with_max_tokens(n);
        }
        if let Some(s) = std::env::var("SLIDESMITH_PROVIDER_TIMEOUT").ok().and_then(|v| v.parse().ok()) {
            config = config.with_timeout(s);
        }

        config
    }
}

/// One completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System constraints plus user content.
    pub prompt: PromptPair,

    /// Credential resolved for this request.
    pub api_key: ApiKey,
}

/// Response from a completion call.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The model text, trimmed.
    pub text: String,

    /// Tokens used for the request.
    pub tokens_used: Option<u32>,
}

/// Trait that AI providers must implement.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Issue a single completion call and return the text answer.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Trim model output and drop a wrapping markdown code fence.
///
/// The closing fence may sit on its own line or right after the last line of
/// content.
pub fn strip_code_fences(text: &str) -> String {
    let text = text.trim();

    // ```language\n...\n```
    if let Some(rest) = text.strip_prefix("```") {
        if let Some((_, body)) = rest.split_once('\n') {
            let body = body.trim_end();
            return body.strip_suffix("```").unwrap_or(body).trim().to_string();
        }
    }

    text.to_string()
}

/// A mock provider for testing.
///
/// Replies are handed out in order; the last one repeats once the queue is
/// exhausted.
#[derive(Debug, Default)]
pub struct MockProvider {
    replies: Vec<String>,
    calls: std::sync::Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    /// Create a new mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub fn with_reply(mut self, text: impl Into<String>) -> Self {
        self.replies.push(text.into());
        self
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AiProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let index = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|e| crate::SlidesmithError::ProviderError(e.to_string()))?;
            calls.push(request);
            calls.len() - 1
        };

        let text = self
            .replies
            .get(index)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or_default();

        Ok(CompletionResponse {
            text: text.trim().to_string(),
            tokens_used: Some(10),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            prompt: PromptPair { system: "s".into(), user: "u".into() },
            api_key: ApiKey::new("sk-test"),
        }
    }

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockProvider::new().with_reply("  first\n").with_reply("second");

        assert_eq!(provider.complete(request()).await.unwrap().text, "first");
        assert_eq!(provider.complete(request()).await.unwrap().text, "second");
        assert_eq!(provider.complete(request()).await.unwrap().text, "second");
        assert_eq!(provider.calls().len(), 3);
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```python\nprint(1)\n```"), "print(1)");
        assert_eq!(strip_code_fences("\n  print(1)  \n"), "print(1)");
        assert_eq!(strip_code_fences("```"), "```");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\nline one\nline two```\n"), "line one\nline two");
        assert_eq!(strip_code_fences("```\n```"), "");
    }

    #[test]
    fn test_temperature_is_clamped() {
        let config = ProviderConfig::new("gpt-4o").with_temperature(5.0);
        assert_eq!(config.temperature, Some(2.0));
    }
}

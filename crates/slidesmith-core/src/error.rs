//! Error types for Slidesmith Core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Slidesmith operations.
pub type Result<T> = std::result::Result<T, SlidesmithError>;

/// Main error type for the generation pipeline.
#[derive(Debug, Error)]
pub enum SlidesmithError {
    /// Neither the request nor the configured fallback carried an API key.
    #[error("Please provide an OpenAI API key (enter it in the form or set OPENAI_API_KEY)")]
    MissingCredential,

    /// The generation request failed validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// AI provider returned an error.
    #[error("AI provider error: {0}")]
    ProviderError(String),

    /// Network request failed.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The model answered with nothing usable.
    #[error("The language model returned an empty response")]
    EmptyResponse,

    /// Model output was rejected before being materialized.
    #[error("Generated output rejected: {0}")]
    Validation(String),

    /// The generated program exited unsuccessfully.
    #[error("Generated program failed with exit code {exit_code:?}: {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The generated program finished without writing the deck.
    #[error("Output artifact not found at {}", .0.display())]
    ArtifactMissing(PathBuf),

    /// Deck rendering failed.
    #[error("Render error: {0}")]
    RenderError(String),

    /// Prompt template could not be registered or rendered.
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Timeout occurred.
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),
}

impl SlidesmithError {
    /// Whether the error was caused by the user's input rather than a
    /// downstream fault.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::InvalidRequest(_))
    }
}

impl From<zip::result::ZipError> for SlidesmithError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::RenderError(e.to_string())
    }
}

impl From<handlebars::TemplateError> for SlidesmithError {
    fn from(e: handlebars::TemplateError) -> Self {
        Self::TemplateError(e.to_string())
    }
}

impl From<handlebars::RenderError> for SlidesmithError {
    fn from(e: handlebars::RenderError) -> Self {
        Self::TemplateError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors() {
        assert!(SlidesmithError::MissingCredential.is_user_error());
        assert!(SlidesmithError::InvalidRequest("x".into()).is_user_error());
        assert!(!SlidesmithError::EmptyResponse.is_user_error());
        assert!(!SlidesmithError::Timeout(3).is_user_error());
    }

    #[test]
    fn test_missing_credential_message() {
        let msg = SlidesmithError::MissingCredential.to_string();
        assert!(msg.starts_with("Please provide an OpenAI API key"));
    }
}

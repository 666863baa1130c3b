//! AI-specific error types.

use slidesmith_core::SlidesmithError;
use thiserror::Error;

/// Errors specific to talking to a model endpoint.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// The key was refused by the endpoint.
    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Response parsing failed.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl AiError {
    /// Classify a non-success response.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => AiError::InvalidApiKey(body),
            429 => AiError::RateLimited(body),
            _ => AiError::ApiError { status, message: body },
        }
    }
}

impl From<AiError> for SlidesmithError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::HttpError(inner) if !inner.is_decode() => SlidesmithError::NetworkError(inner.to_string()),
            other => SlidesmithError::ProviderError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(AiError::from_status(401, "bad key".into()), AiError::InvalidApiKey(_)));
        assert!(matches!(AiError::from_status(429, "slow down".into()), AiError::RateLimited(_)));
        assert!(matches!(
            AiError::from_status(500, "oops".into()),
            AiError::ApiError { status: 500, .. }
        ));
    }

    #[test]
    fn test_into_core_error() {
        let err: SlidesmithError = AiError::from_status(500, "oops".into()).into();
        match err {
            SlidesmithError::ProviderError(msg) => assert!(msg.contains("500") && msg.contains("oops")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

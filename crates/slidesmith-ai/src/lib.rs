//! # Slidesmith AI
//!
//! Language-model backends for the Slidesmith generation pipeline.
//!
//! - **OpenAI**: any chat-completions model (gpt-4o by default)
//!
//! ## Example
//!
//! ```rust,ignore
//! use slidesmith_ai::OpenAiProvider;
//! use slidesmith_core::{Pipeline, SlidesmithConfig};
//!
//! let provider = OpenAiProvider::from_env()?;
//! let pipeline = Pipeline::new(provider, SlidesmithConfig::from_env()?)?;
//! ```

pub mod error;
pub mod openai;

pub use error::AiError;
pub use openai::OpenAiProvider;

/// Re-export core types for convenience.
pub use slidesmith_core::{AiProvider, ProviderConfig, Result, SlidesmithError};

/// Create an OpenAI provider for `model` with a single line.
///
/// # Example
///
/// ```rust,ignore
/// let provider = slidesmith_ai::openai("gpt-4o")?;
/// ```
pub fn openai(model: &str) -> Result<OpenAiProvider> {
    OpenAiProvider::from_env_with_model(model)
}

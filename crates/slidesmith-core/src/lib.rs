//! # Slidesmith Core
//!
//! Core library for turning a natural-language description into a `.pptx`
//! slide deck with a language model.
//!
//! This crate holds everything between the incoming request and the finished
//! artifact: credential resolution, prompt construction, model output
//! validation, program execution and the built-in PPTX renderer.
//!
//! ## Features
//!
//! - Structured mode: the model answers with a JSON deck rendered in-process
//! - Script mode: the model writes a python-pptx program run in an isolated workspace
//! - Optional self-healing retries with validation feedback
//! - Extensible provider trait for AI backends
//!
//! ## Example
//!
//! ```rust,ignore
//! use slidesmith_core::{GenerationRequest, Pipeline, SlidesmithConfig};
//!
//! let pipeline = Pipeline::new(provider, SlidesmithConfig::from_env()?)?;
//! let artifact = pipeline
//!     .run(GenerationRequest::new(3, "Intro to cats").with_color("#112233".parse()?))
//!     .await?;
//! std::fs::write(&artifact.download_name, &artifact.bytes)?;
//! ```

pub mod artifact;
pub mod config;
pub mod deck;
pub mod error;
pub mod executor;
pub mod observer;
pub mod pipeline;
pub mod pptx;
pub mod prompt;
pub mod provider;
pub mod reference;
pub mod request;
pub mod validation;
pub mod workspace;

pub use artifact::{Artifact, PPTX_MIME};
pub use config::{GenerationMode, SlidesmithConfig};
pub use deck::{Bullet, CodeBlock, ContentSlide, Deck, Frame, Slide, TitleSlide};
pub use error::{Result, SlidesmithError};
pub use executor::{ExecutionOutcome, ExecutionPolicy, ScriptExecutor};
pub use observer::{ObserverPtr, PipelineObserver, Stage};
pub use pipeline::Pipeline;
pub use pptx::{render_pptx, write_pptx};
pub use prompt::{PromptBuilder, PromptPair};
pub use provider::{AiProvider, CompletionRequest, CompletionResponse, MockProvider, ProviderConfig};
pub use request::{resolve_credential, ApiKey, GenerationRequest, Rgb, DEFAULT_MAX_SLIDES};
pub use validation::{PatternValidator, SyntaxValidator, ValidationResult, Validator, ValidatorChain};
pub use workspace::RequestWorkspace;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        AiProvider, ApiKey, Artifact, Deck, GenerationMode, GenerationRequest, Pipeline, ProviderConfig, Result, Rgb,
        SlidesmithConfig, SlidesmithError,
    };
}

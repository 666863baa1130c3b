use crate::GenerationRequest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Prompting,
    Synthesizing,
    Validating,
    Executing,
    Rendering,
    Retrieving,
}

/// Trait for observing pipeline events (logging, UI).
pub trait PipelineObserver: Send + Sync {
    /// Called when a generation starts.
    fn on_start(&self, id: &str, request: &GenerationRequest);

    /// Called when the pipeline enters a stage.
    fn on_stage(&self, _id: &str, _stage: Stage) {}

    /// Called when model output was rejected and the model is asked again.
    fn on_healing_step(&self, id: &str, attempt: u32, error: &str);

    /// Called when the artifact is ready.
    fn on_success(&self, id: &str, artifact_bytes: usize, tokens_used: Option<u32>);

    /// Called when a generation fails permanently.
    fn on_failure(&self, id: &str, error: &str);

    /// Called when a generation is abandoned before finishing, for example
    /// because the client went away.
    fn on_cancelled(&self, id: &str) {
        self.on_failure(id, "generation cancelled before completion");
    }
}

pub type ObserverPtr = Arc<dyn PipelineObserver>;

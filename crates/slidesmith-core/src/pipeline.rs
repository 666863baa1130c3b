//! Generation Pipeline - The main orchestrator.
//!
//! Request → credential → prompt → model → validation → materialization →
//! artifact. Each run owns its own workspace; a semaphore bounds how many runs
//! are in flight.

use crate::artifact::Artifact;
use crate::config::{GenerationMode, SlidesmithConfig};
use crate::deck::Deck;
use crate::executor::{ExecutionOutcome, ScriptExecutor};
use crate::observer::{ObserverPtr, Stage};
use crate::pptx::render_pptx;
use crate::provider::{strip_code_fences, AiProvider, CompletionRequest};
use crate::validation::{PatternValidator, SyntaxValidator, ValidationResult, Validator, ValidatorChain};
use crate::workspace::RequestWorkspace;
use crate::{resolve_credential, ApiKey, GenerationRequest, PromptBuilder, PromptPair, Result, SlidesmithError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// The main engine turning requests into decks.
///
/// # Example
///
/// ```rust,ignore
/// use slidesmith_core::{GenerationRequest, Pipeline, SlidesmithConfig};
/// use slidesmith_ai::OpenAiProvider;
///
/// let provider = OpenAiProvider::from_env()?;
/// let pipeline = Pipeline::new(provider, SlidesmithConfig::from_env()?)?;
///
/// let request = GenerationRequest::new(5, "A short history of tea");
/// let artifact = pipeline.run(request).await?;
/// ```
pub struct Pipeline<P: AiProvider> {
    provider: Arc<P>,
    config: Arc<SlidesmithConfig>,
    prompts: PromptBuilder,
    validator: Arc<dyn Validator>,
    executor: ScriptExecutor,
    permits: Semaphore,
    observer: Option<ObserverPtr>,
}

impl<P: AiProvider + 'static> Pipeline<P> {
    /// Create a pipeline with validators derived from the configuration.
    pub fn new(provider: P, config: SlidesmithConfig) -> Result<Self> {
        let mut chain = ValidatorChain::new();
        if !config.forbidden_patterns.is_empty() {
            chain = chain.with(PatternValidator::new(&config.forbidden_patterns)?);
        }
        if config.syntax_check {
            chain = chain.with(SyntaxValidator::python(config.interpreter.clone()).with_timeout(config.exec_timeout));
        }

        Ok(Self {
            provider: Arc::new(provider),
            prompts: PromptBuilder::from_config(&config)?,
            validator: Arc::new(chain),
            executor: ScriptExecutor::from_config(&config),
            permits: Semaphore::new(config.max_concurrent.max(1)),
            config: Arc::new(config),
            observer: None,
        })
    }

    /// Replace the program validators.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Attach an observer.
    pub fn with_observer(mut self, observer: ObserverPtr) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &SlidesmithConfig {
        &self.config
    }

    fn mode_for(&self, request: &GenerationRequest) -> GenerationMode {
        request.mode.unwrap_or(self.config.mode)
    }

    /// Build the prompt a request would send, without calling the model.
    pub fn preview_prompt(&self, request: &GenerationRequest) -> Result<PromptPair> {
        request.validate(self.config.max_slides)?;
        self.prompts.build(self.mode_for(request), request)
    }

    /// Run the whole pipeline for one request.
    pub async fn run(&self, request: GenerationRequest) -> Result<Artifact> {
        self.run_as(Uuid::new_v4(), request).await
    }

    /// Run under a caller-chosen generation id, the one observers see.
    ///
    /// If the returned future is dropped before completion, observers get
    /// `on_cancelled`.
    #[instrument(skip(self, request), fields(slides = request.slide_count, color = %request.background_color))]
    pub async fn run_as(&self, id: Uuid, request: GenerationRequest) -> Result<Artifact> {
        let id_str = id.to_string();
        if let Some(observer) = &self.observer {
            observer.on_start(&id_str, &request);
        }
        let mut guard = CancelGuard {
            observer: self.observer.as_ref(),
            id: &id_str,
            finished: false,
        };

        let result = self.run_inner(id, &request).await;
        guard.finished = true;

        match &result {
            Ok((artifact, tokens)) => {
                info!("Generation {} produced {} bytes", id, artifact.bytes.len());
                if let Some(observer) = &self.observer {
                    observer.on_success(&id_str, artifact.bytes.len(), *tokens);
                }
            }
            Err(e) => {
                warn!("Generation {} failed: {}", id, e);
                if let Some(observer) = &self.observer {
                    observer.on_failure(&id_str, &e.to_string());
                }
            }
        }

        result.map(|(artifact, _)| artifact)
    }

    async fn run_inner(&self, id: Uuid, request: &GenerationRequest) -> Result<(Artifact, Option<u32>)> {
        request.validate(self.config.max_slides)?;
        let api_key = resolve_credential(request.api_key.as_deref(), self.config.fallback_api_key.as_ref())?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| SlidesmithError::ConfigError(e.to_string()))?;

        let mode = self.mode_for(request);
        self.stage(id, Stage::Prompting);
        let prompt = self.prompts.build(mode, request)?;
        debug!("Built {:?} prompt for generation {}", mode, id);

        match mode {
            GenerationMode::Script => self.run_script(id, &prompt, &api_key).await,
            GenerationMode::Structured => self.run_structured(id, request, &prompt, &api_key).await,
        }
    }

    async fn run_script(&self, id: Uuid, prompt: &PromptPair, api_key: &ApiKey) -> Result<(Artifact, Option<u32>)> {
        let validator = Arc::clone(&self.validator);
        let (code, tokens) = self
            .synthesize_checked(id, prompt, api_key, move |code| {
                let validator = Arc::clone(&validator);
                async move {
                    Ok(match validator.validate(&code).await? {
                        ValidationResult::Valid => Ok(code),
                        ValidationResult::Invalid(reason) => Err(reason),
                    })
                }
            })
            .await?;

        let workspace = RequestWorkspace::create(id, self.config.work_dir.as_deref())?;

        self.stage(id, Stage::Executing);
        match self.executor.execute(&workspace, &code).await? {
            ExecutionOutcome::TimedOut { after } => return Err(SlidesmithError::Timeout(after.as_secs())),
            ExecutionOutcome::Completed { exit_code, stderr, .. } if exit_code != Some(0) => {
                return Err(SlidesmithError::ExecutionFailed { exit_code, stderr });
            }
            ExecutionOutcome::Completed { duration_ms, .. } => {
                debug!("Generated program finished in {} ms", duration_ms);
            }
        }

        self.stage(id, Stage::Retrieving);
        let artifact = Artifact::retrieve(&workspace.output_path(), self.config.download_name.clone()).await?;
        Ok((artifact, tokens))
    }

    async fn run_structured(
        &self,
        id: Uuid,
        request: &GenerationRequest,
        prompt: &PromptPair,
        api_key: &ApiKey,
    ) -> Result<(Artifact, Option<u32>)> {
        let expected = request.slide_count;
        let (deck, tokens) = self
            .synthesize_checked(id, prompt, api_key, move |text| async move {
                Ok(match Deck::from_model_output(&text) {
                    Ok(deck) => match deck.check(expected) {
                        ValidationResult::Valid => Ok(deck),
                        ValidationResult::Invalid(reason) => Err(reason),
                    },
                    Err(SlidesmithError::Validation(reason)) => Err(reason),
                    Err(e) => return Err(e),
                })
            })
            .await?;

        self.stage(id, Stage::Rendering);
        let deck = deck.with_background(request.background_color);
        let bytes = render_pptx(&deck)?;
        Ok((Artifact::new(bytes, self.config.download_name.clone()), tokens))
    }

    /// Ask the model, check its answer, and retry with feedback while
    /// self-healing attempts remain.
    async fn synthesize_checked<T, F, Fut>(
        &self,
        id: Uuid,
        base: &PromptPair,
        api_key: &ApiKey,
        mut check: F,
    ) -> Result<(T, Option<u32>)>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<std::result::Result<T, String>>>,
    {
        let attempts = self.config.attempts();
        let mut prompt = base.clone();
        let mut tokens: Option<u32> = None;

        for attempt in 1..=attempts {
            self.stage(id, Stage::Synthesizing);
            let response = self
                .provider
                .complete(CompletionRequest {
                    prompt: prompt.clone(),
                    api_key: api_key.clone(),
                })
                .await?;
            tokens = match (tokens, response.tokens_used) {
                (Some(a), Some(b)) => Some(a.saturating_add(b)),
                (a, b) => a.or(b),
            };

            let text = strip_code_fences(&response.text);
            if text.is_empty() {
                return Err(SlidesmithError::EmptyResponse);
            }

            self.stage(id, Stage::Validating);
            match check(text).await? {
                Ok(value) => return Ok((value, tokens)),
                Err(reason) if attempt < attempts => {
                    debug!("Attempt {} rejected: {}", attempt, reason);
                    if let Some(observer) = &self.observer {
                        observer.on_healing_step(&id.to_string(), attempt, &reason);
                    }
                    prompt = base.with_feedback(&self.config.prompt_healing_feedback, &reason);
                }
                Err(reason) => return Err(SlidesmithError::Validation(reason)),
            }
        }

        Err(SlidesmithError::Validation("no attempts allowed".to_string()))
    }

    fn stage(&self, id: Uuid, stage: Stage) {
        debug!("Generation {} entering {:?}", id, stage);
        if let Some(observer) = &self.observer {
            observer.on_stage(&id.to_string(), stage);
        }
    }
}

/// Reports a run whose future was dropped mid-flight.
struct CancelGuard<'a> {
    observer: Option<&'a ObserverPtr>,
    id: &'a str,
    finished: bool,
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("Generation {} cancelled", self.id);
        if let Some(observer) = self.observer {
            observer.on_cancelled(self.id);
        }
    }
}

//! # Slidesmith Configuration
//!
//! Central configuration for the generation pipeline.
//! Supports loading from environment variables and programmatic defaults.

use crate::request::{ApiKey, DEFAULT_MAX_SLIDES};
use crate::SlidesmithError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How model output is turned into a deck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// The model returns a JSON deck rendered by the built-in PPTX writer.
    #[default]
    Structured,

    /// The model returns a python-pptx program that is executed.
    Script,
}

impl FromStr for GenerationMode {
    type Err = SlidesmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structured" | "json" => Ok(Self::Structured),
            "script" | "python" => Ok(Self::Script),
            other => Err(SlidesmithError::ConfigError(format!(
                "unknown generation mode '{}'",
                other
            ))),
        }
    }
}

/// Global configuration for the pipeline.
///
/// # Example
/// ```rust
/// use slidesmith_core::SlidesmithConfig;
///
/// let config = SlidesmithConfig::default()
///     .with_healing(true)
///     .with_max_retries(3);
/// assert_eq!(config.max_retries, 3);
/// ```
#[derive(Debug, Clone)]
pub struct SlidesmithConfig {
    /// How model output is materialized.
    /// Default: Structured, Env: SLIDESMITH_MODE=script
    pub mode: GenerationMode,

    /// Upper bound for the requested slide count.
    /// Default: 20, Env: SLIDESMITH_MAX_SLIDES
    pub max_slides: u8,

    /// Interpreter used to check and run generated programs.
    /// Default: python3, Env: SLIDESMITH_INTERPRETER
    pub interpreter: PathBuf,

    /// Wall-clock limit for one generated program.
    /// Default: 120s, Env: SLIDESMITH_EXEC_TIMEOUT (seconds)
    pub exec_timeout: Duration,

    /// Run generated programs with a cleared environment.
    /// Default: true, Env: SLIDESMITH_CLEAR_ENV=false
    pub clear_env: bool,

    /// Variables passed through when the environment is cleared.
    pub env_allowlist: Vec<String>,

    /// Syntax-check generated programs before running them.
    /// Default: true, Env: SLIDESMITH_SYNTAX_CHECK=false
    pub syntax_check: bool,

    /// Regex patterns that make a generated program unacceptable.
    /// Env: SLIDESMITH_FORBIDDEN (comma separated)
    pub forbidden_patterns: Vec<String>,

    /// Feed validation errors back to the model and retry.
    /// Default: false, Env: SLIDESMITH_HEALING=true
    pub healing_enabled: bool,

    /// Maximum healing retries.
    /// Default: 2, Env: SLIDESMITH_MAX_RETRIES
    pub max_retries: u32,

    /// Maximum generations running at once.
    /// Default: 4, Env: SLIDESMITH_MAX_CONCURRENT
    pub max_concurrent: usize,

    /// Directory under which per-request workspaces are created.
    /// Default: system temp dir, Env: SLIDESMITH_WORK_DIR
    pub work_dir: Option<PathBuf>,

    /// Filename offered to the user on download.
    /// Default: generated_presentation.pptx, Env: SLIDESMITH_DOWNLOAD_NAME
    pub download_name: String,

    /// Credential used when the request carries none.
    /// Env: OPENAI_API_KEY
    pub fallback_api_key: Option<ApiKey>,

    /// Feedback prefix for self-healing retries.
    pub prompt_healing_feedback: String,

    /// Override for the script-mode system prompt template.
    /// Env: SLIDESMITH_PROMPT_SCRIPT
    pub prompt_script_template: Option<String>,

    /// Override for the structured-mode system prompt template.
    /// Env: SLIDESMITH_PROMPT_STRUCTURED
    pub prompt_structured_template: Option<String>,
}

impl Default for SlidesmithConfig {
    fn default() -> Self {
        Self {
            mode: GenerationMode::default(),
            max_slides: DEFAULT_MAX_SLIDES,
            interpreter: PathBuf::from("python3"),
            exec_timeout: Duration::from_secs(120),
            clear_env: true,
            env_allowlist: ["PATH", "HOME", "LANG", "LC_ALL", "PYTHONPATH", "VIRTUAL_ENV", "SYSTEMROOT", "TEMP", "TMP"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            syntax_check: true,
            forbidden_patterns: Vec::new(),
            healing_enabled: false,
            max_retries: 2,
            max_concurrent: 4,
            work_dir: None,
            download_name: "generated_presentation.pptx".to_string(),
            fallback_api_key: None,
            prompt_healing_feedback: "[SELF-HEALING FEEDBACK]\nYour previous output was rejected. Fix the problem and output ONLY the corrected result.\nERROR:\n".to_string(),
            prompt_script_template: None,
            prompt_structured_template: None,
        }
    }
}

fn flag(v: &str) -> bool {
    v.to_lowercase() == "true" || v == "1"
}

impl SlidesmithConfig {
    /// Create a new config from environment variables.
    /// Falls back to defaults for missing variables.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = env::var("SLIDESMITH_MODE") {
            config.mode = v.parse()?;
        }
        if let Ok(v) = env::var("SLIDESMITH_MAX_SLIDES") {
            config.max_slides = v
                .parse()
                .map_err(|_| SlidesmithError::ConfigError(format!("SLIDESMITH_MAX_SLIDES: '{}'", v)))?;
        }
        if let Ok(v) = env::var("SLIDESMITH_INTERPRETER") {
            config.interpreter = PathBuf::from(v);
        }
        if let Ok(v) = env::var("SLIDESMITH_EXEC_TIMEOUT") {
            if let Ok(n) = v.parse() {
                config.exec_timeout = Duration::from_secs(n);
            }
        }
        if let Ok(v) = env::var("SLIDESMITH_CLEAR_ENV") {
            config.clear_env = v.to_lowercase() != "false" && v != "0";
        }
        if let Ok(v) = env::var("SLIDESMITH_SYNTAX_CHECK") {
            config.syntax_check = v.to_lowercase() != "false" && v != "0";
        }
        if let Ok(v) = env::var("SLIDESMITH_FORBIDDEN") {
            config.forbidden_patterns = v
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(v) = env::var("SLIDESMITH_HEALING") {
            config.healing_enabled = flag(&v);
        }
        if let Ok(v) = env::var("SLIDESMITH_MAX_RETRIES") {
            if let Ok(n) = v.parse() {
                config.max_retries = n;
            }
        }
        if let Ok(v) = env::var("SLIDESMITH_MAX_CONCURRENT") {
            if let Ok(n) = v.parse::<usize>() {
                config.max_concurrent = n.max(1);
            }
        }
        if let Ok(v) = env::var("SLIDESMITH_WORK_DIR") {
            config.work_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("SLIDESMITH_DOWNLOAD_NAME") {
            config.download_name = v;
        }
        if let Ok(v) = env::var("OPENAI_API_KEY") {
            if !v.trim().is_empty() {
                config.fallback_api_key = Some(ApiKey::new(v));
            }
        }
        if let Ok(v) = env::var("SLIDESMITH_PROMPT_HEALING_FEEDBACK") {
            config.prompt_healing_feedback = v;
        }
        if let Ok(v) = env::var("SLIDESMITH_PROMPT_SCRIPT") {
            config.prompt_script_template = Some(v);
        }
        if let Ok(v) = env::var("SLIDESMITH_PROMPT_STRUCTURED") {
            config.prompt_structured_template = Some(v);
        }

        Ok(config)
    }

    /// Builder: Set the generation mode.
    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder: Set the interpreter for generated programs.
    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Builder: Set the execution timeout.
    pub fn with_exec_timeout(mut self, timeout: Duration) -> Self {
        self.exec_timeout = timeout;
        self
    }

    /// Builder: Enable or disable the syntax check.
    pub fn with_syntax_check(mut self, enabled: bool) -> Self {
        self.syntax_check = enabled;
        self
    }

    /// Builder: Add a forbidden pattern.
    pub fn forbid_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.forbidden_patterns.push(pattern.into());
        self
    }

    /// Builder: Enable or disable Self-Healing.
    pub fn with_healing(mut self, enabled: bool) -> Self {
        self.healing_enabled = enabled;
        self
    }

    /// Builder: Set maximum retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Builder: Set maximum concurrent generations.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    /// Builder: Set the workspace base directory.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Builder: Set the fallback credential.
    pub fn with_fallback_api_key(mut self, key: Option<ApiKey>) -> Self {
        self.fallback_api_key = key;
        self
    }

    /// Number of model calls allowed for one request.
    pub fn attempts(&self) -> u32 {
        if self.healing_enabled {
            self.max_retries + 1
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SlidesmithConfig::default();
        assert_eq!(config.mode, GenerationMode::Structured);
        assert_eq!(config.max_slides, 20);
        assert!(config.clear_env);
        assert!(!config.healing_enabled);
        assert_eq!(config.download_name, "generated_presentation.pptx");
        assert_eq!(config.attempts(), 1);
    }

    #[test]
    fn test_builder_pattern() {
        let config = SlidesmithConfig::default()
            .with_mode(GenerationMode::Script)
            .with_healing(true)
            .with_max_retries(5)
            .with_max_concurrent(0);

        assert_eq!(config.mode, GenerationMode::Script);
        assert_eq!(config.attempts(), 6);
        assert_eq!(config.max_concurrent, 1);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("script".parse::<GenerationMode>().unwrap(), GenerationMode::Script);
        assert_eq!("JSON".parse::<GenerationMode>().unwrap(), GenerationMode::Structured);
        assert!("html".parse::<GenerationMode>().is_err());
    }
}

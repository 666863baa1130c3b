use crate::{Result, SlidesmithError};
use async_trait::async_trait;
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

/// Upper bound for one checker run unless overridden.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

const PY_PARSE: &str =
    "import ast, sys; ast.parse(open(sys.argv[1], encoding='utf-8').read(), sys.argv[1])";

/// Result of a code validation check.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// Validation passed.
    Valid,
    /// Validation failed with a specific error message.
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Trait for checks run on synthesized programs before execution.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Check if the code is acceptable according to the validator's rules.
    async fn validate(&self, code: &str) -> Result<ValidationResult>;
}

/// Rejects code matching any forbidden regex.
#[derive(Debug, Clone, Default)]
pub struct PatternValidator {
    forbidden: Vec<Regex>,
}

impl PatternValidator {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let forbidden = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| {
                    SlidesmithError::ConfigError(format!("bad forbidden pattern '{}': {}", p.as_ref(), e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { forbidden })
    }
}

#[async_trait]
impl Validator for PatternValidator {
    async fn validate(&self, code: &str) -> Result<ValidationResult> {
        for re in &self.forbidden {
            if re.is_match(code) {
                return Ok(ValidationResult::Invalid(format!(
                    "Code contains forbidden pattern: {}",
                    re.as_str()
                )));
            }
        }
        Ok(ValidationResult::Valid)
    }
}

/// Runs an external checker (by default Python's `ast.parse`) on the code.
#[derive(Debug, Clone)]
pub struct SyntaxValidator {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl SyntaxValidator {
    /// Parse with `<interpreter>` without compiling bytecode to disk.
    pub fn python(interpreter: impl Into<PathBuf>) -> Self {
        Self::command(interpreter, ["-c", PY_PARSE])
    }

    /// Check with an arbitrary command; the file path is appended last.
    pub fn command<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    /// Kill the checker after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Validator for SyntaxValidator {
    async fn validate(&self, code: &str) -> Result<ValidationResult> {
        let mut tmp_file = tempfile::Builder::new().suffix(".py").tempfile()?;
        tmp_file.write_all(code.as_bytes())?;
        tmp_file.flush()?;

        let run = Command::new(&self.program)
            .args(&self.args)
            .arg(tmp_file.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(output) => output?,
            Err(_) => {
                warn!("Syntax checker exceeded {:?}, killed", self.timeout);
                return Err(SlidesmithError::Timeout(self.timeout.as_secs()));
            }
        };

        if output.status.success() {
            Ok(ValidationResult::Valid)
        } else {
            let err = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Ok(ValidationResult::Invalid(format!("Syntax Error:\n{}", err)))
        }
    }
}

/// Runs several validators, stopping at the first rejection.
#[derive(Default)]
pub struct ValidatorChain {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

#[async_trait]
impl Validator for ValidatorChain {
    async fn validate(&self, code: &str) -> Result<ValidationResult> {
        for validator in &self.validators {
            let result = validator.validate(code).await?;
            if !result.is_valid() {
                return Ok(result);
            }
        }
        Ok(ValidationResult::Valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_forbidden_patterns() {
        let validator = PatternValidator::new(&[r"\bsubprocess\b", r"os\.system"]).unwrap();

        let ok = validator.validate("from pptx import Presentation").await.unwrap();
        assert!(ok.is_valid());

        let bad = validator.validate("import os\nos.system('rm -rf /')").await.unwrap();
        assert_eq!(bad, ValidationResult::Invalid("Code contains forbidden pattern: os\\.system".into()));
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        assert_err!(PatternValidator::new(&["("]));
        assert_ok!(PatternValidator::new::<&str>(&[]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_syntax_check_with_shell() {
        let validator = SyntaxValidator::command("sh", ["-n"]);

        let ok = validator.validate("echo hello\n").await.unwrap();
        assert!(ok.is_valid());

        let bad = validator.validate("if then fi (\n").await.unwrap();
        assert!(matches!(bad, ValidationResult::Invalid(ref msg) if msg.starts_with("Syntax Error")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hanging_checker_times_out() {
        let validator = SyntaxValidator::command("sh", ["-c", "sleep 5", "checker"])
            .with_timeout(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let err = validator.validate("anything").await.unwrap_err();
        assert!(matches!(err, SlidesmithError::Timeout(0)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    fn python3_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_python_syntax_check() {
        if !python3_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let validator = SyntaxValidator::python("python3");

        let ok = validator
            .validate("from pptx import Presentation\nprs = Presentation()\nprs.save('output.pptx')\n")
            .await
            .unwrap();
        assert!(ok.is_valid());

        let bad = validator.validate("def broken(:\n    pass\n").await.unwrap();
        assert!(matches!(bad, ValidationResult::Invalid(ref msg) if msg.contains("SyntaxError")));

        // Parsing only: nothing is executed or written.
        let side_effect = dir.path().join("touched");
        let code = format!("open({:?}, 'w').write('x')\n", side_effect.display().to_string());
        assert!(validator.validate(&code).await.unwrap().is_valid());
        assert!(!side_effect.exists());
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_rejection() {
        let chain = ValidatorChain::new()
            .with(PatternValidator::new(&["first"]).unwrap())
            .with(PatternValidator::new(&["second"]).unwrap());

        let result = chain.validate("first second").await.unwrap();
        assert_eq!(result, ValidationResult::Invalid("Code contains forbidden pattern: first".into()));
        assert!(ValidatorChain::new().validate("anything").await.unwrap().is_valid());
    }
}

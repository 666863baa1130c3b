//! Running synthesized programs.
//!
//! The program is written into its request workspace and run there by the
//! configured interpreter. The child is killed when the timeout expires or the
//! awaiting future is dropped.

use crate::config::SlidesmithConfig;
use crate::workspace::RequestWorkspace;
use crate::Result;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Longest stdout/stderr tail kept from a child process.
const MAX_CAPTURE_BYTES: usize = 16 * 1024;

/// Limits applied to one program run.
#[derive(Debug, Clone)]
pub struct ExecutionPolicy {
    pub timeout: Duration,

    /// Start the child with an empty environment plus `env_allowlist`.
    pub clear_env: bool,

    pub env_allowlist: Vec<String>,
}

impl ExecutionPolicy {
    pub fn from_config(config: &SlidesmithConfig) -> Self {
        Self {
            timeout: config.exec_timeout,
            clear_env: config.clear_env,
            env_allowlist: config.env_allowlist.clone(),
        }
    }
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self::from_config(&SlidesmithConfig::default())
    }
}

/// How a program run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The process exited on its own.
    Completed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration_ms: u64,
    },
    /// The process was killed after exceeding the timeout.
    TimedOut { after: Duration },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { exit_code: Some(0), .. })
    }
}

/// Writes a program into a workspace and runs it.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    interpreter: PathBuf,
    policy: ExecutionPolicy,
}

impl ScriptExecutor {
    pub fn new(interpreter: impl Into<PathBuf>, policy: ExecutionPolicy) -> Self {
        Self {
            interpreter: interpreter.into(),
            policy,
        }
    }

    pub fn from_config(config: &SlidesmithConfig) -> Self {
        Self::new(config.interpreter.clone(), ExecutionPolicy::from_config(config))
    }

    /// Persist `code` to the workspace script path and run it to completion.
    #[instrument(skip(self, workspace, code), fields(workspace = %workspace.id()))]
    pub async fn execute(&self, workspace: &RequestWorkspace, code: &str) -> Result<ExecutionOutcome> {
        let script = workspace.script_path();
        tokio::fs::write(&script, code).await?;
        debug!("Wrote {} bytes to {}", code.len(), script.display());

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&script)
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if self.policy.clear_env {
            cmd.env_clear();
            for key in &self.policy.env_allowlist {
                if let Some(value) = std::env::var_os(key) {
                    cmd.env(key, value);
                }
            }
        }

        let start = Instant::now();
        match tokio::time::timeout(self.policy.timeout, cmd.output()).await {
            Ok(output) => {
                let output = output?;
                let outcome = ExecutionOutcome::Completed {
                    exit_code: output.status.code(),
                    stdout: tail(&output.stdout),
                    stderr: tail(&output.stderr),
                    duration_ms: start.elapsed().as_millis() as u64,
                };
                debug!("Program exited with {:?}", output.status.code());
                Ok(outcome)
            }
            Err(_) => {
                warn!("Program exceeded {:?}, killed", self.policy.timeout);
                Ok(ExecutionOutcome::TimedOut {
                    after: self.policy.timeout,
                })
            }
        }
    }
}

/// Lossy UTF-8 of the last `MAX_CAPTURE_BYTES` of a stream.
fn tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(MAX_CAPTURE_BYTES);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}

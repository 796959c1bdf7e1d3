//! Pattern execution.
//!
//! Real execution runs a pattern through an external AI CLI. When no CLI is
//! available the deterministic simulator stands in, unless strict execution is
//! enabled.
//!
//! # Configuration
//!
//! - CLI arguments: `--executor`, `--model`
//! - Environment variables: `PATTERN_QA_EXECUTOR`, `PATTERN_QA_MODEL`
//!
//! CLI arguments take precedence over environment variables.

use std::collections::HashMap;
use std::env;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;

use log::{debug, warn};

use crate::models::{PatternArtifact, SampleInput};
use crate::quality::tester::SimulatedExecutor;
use crate::utils::truncate;

/// Longest stderr excerpt carried in an error message.
const MAX_STDERR_CHARS: usize = 300;

/// Errors from running a pattern against one sample.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// No execution backend could be reached.
    #[error("Executor unavailable: {0}")]
    Unavailable(String),
    #[error("Execution failed: {0}")]
    Failed(String),
    #[error("Executor returned no output")]
    EmptyOutput,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Text produced by one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub text: String,
    /// The text is placeholder output, not a model response.
    pub simulated: bool,
}

/// Produces output text for a pattern applied to a sample.
pub trait PatternExecutor: Send + Sync {
    fn execute(&self, artifact: &PatternArtifact, sample: &SampleInput)
        -> Result<String, ExecutionError>;

    /// Whether output from this executor is placeholder text.
    fn is_simulated(&self) -> bool {
        false
    }

    /// Execute and tag the output with its provenance.
    fn run(
        &self,
        artifact: &PatternArtifact,
        sample: &SampleInput,
    ) -> Result<ExecutionOutput, ExecutionError> {
        self.execute(artifact, sample).map(|text| ExecutionOutput {
            text,
            simulated: self.is_simulated(),
        })
    }
}

/// Available execution backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorProvider {
    /// Claude CLI (default)
    #[default]
    Claude,
    /// OpenCode CLI
    OpenCode,
    /// Deterministic placeholder output
    Simulated,
}

impl std::fmt::Display for ExecutorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Claude => write!(f, "claude"),
            Self::OpenCode => write!(f, "opencode"),
            Self::Simulated => write!(f, "simulated"),
        }
    }
}

impl std::str::FromStr for ExecutorProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claude" => Ok(Self::Claude),
            "opencode" => Ok(Self::OpenCode),
            "simulated" | "simulate" | "sim" => Ok(Self::Simulated),
            _ => Err(format!(
                "Unknown executor: '{}'. Valid options: claude, opencode, simulated",
                s
            )),
        }
    }
}

/// Configuration for pattern executors.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    pub provider: ExecutorProvider,
    pub model: Option<String>,
    /// Never substitute simulated output for an unavailable executor.
    pub strict: bool,
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `PATTERN_QA_EXECUTOR` and `PATTERN_QA_MODEL`.
    pub fn from_env() -> Self {
        let provider = env::var("PATTERN_QA_EXECUTOR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let model = env::var("PATTERN_QA_MODEL").ok();

        Self {
            provider,
            model,
            strict: false,
        }
    }

    pub fn with_provider(mut self, provider: ExecutorProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Merge with CLI overrides. CLI values take precedence.
    pub fn with_overrides(
        mut self,
        provider: Option<ExecutorProvider>,
        model: Option<String>,
    ) -> Self {
        if let Some(p) = provider {
            self.provider = p;
        }
        if let Some(m) = model {
            self.model = Some(m);
        }
        self
    }

    pub fn create_executor(&self) -> Arc<dyn PatternExecutor> {
        let primary: Arc<dyn PatternExecutor> = match self.provider {
            ExecutorProvider::Simulated => return Arc::new(SimulatedExecutor),
            ExecutorProvider::Claude => Arc::new(ClaudeCliExecutor {
                model: self.model.clone(),
            }),
            ExecutorProvider::OpenCode => Arc::new(OpenCodeExecutor {
                model: self.model.clone(),
            }),
        };

        if self.strict {
            primary
        } else {
            Arc::new(FallbackExecutor::new(primary))
        }
    }
}

/// Build the prompt sent to a model: the pattern followed by the sample.
pub fn build_prompt(artifact: &PatternArtifact, sample: &SampleInput) -> String {
    let mut prompt = artifact.instructions.trim_end().to_string();
    prompt.push_str("\n\n");
    prompt.push_str(sample.content.trim());
    prompt.push('\n');
    prompt
}

/// Runs patterns through the Claude CLI.
pub struct ClaudeCliExecutor {
    pub model: Option<String>,
}

impl PatternExecutor for ClaudeCliExecutor {
    fn execute(
        &self,
        artifact: &PatternArtifact,
        sample: &SampleInput,
    ) -> Result<String, ExecutionError> {
        // Use stdin for the prompt to avoid command line length limits
        let mut args = vec!["--print"];
        if let Some(model) = &self.model {
            args.push("--model");
            args.push(model);
        }

        let mut child = Command::new("claude")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error("claude", e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(build_prompt(artifact, sample).as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ExecutionError::Failed(format!(
                "claude CLI failed (exit {}): {}",
                output.status.code().unwrap_or(-1),
                truncate(String::from_utf8_lossy(&output.stderr).trim(), MAX_STDERR_CHARS)
            )));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("claude CLI stderr: {}", stderr.trim());
        }

        non_empty(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Runs patterns through the OpenCode CLI.
pub struct OpenCodeExecutor {
    /// Model in `provider/model` form.
    pub model: Option<String>,
}

impl PatternExecutor for OpenCodeExecutor {
    fn execute(
        &self,
        artifact: &PatternArtifact,
        sample: &SampleInput,
    ) -> Result<String, ExecutionError> {
        let prompt = build_prompt(artifact, sample);
        let mut args = vec!["run", prompt.as_str(), "--format", "json"];
        if let Some(model) = &self.model {
            args.push("-m");
            args.push(model);
        }

        let output = Command::new("opencode")
            .args(&args)
            .output()
            .map_err(|e| spawn_error("opencode", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(ExecutionError::Failed(format!(
                "opencode CLI failed (exit {}): {}",
                output.status.code().unwrap_or(-1),
                truncate(String::from_utf8_lossy(&output.stderr).trim(), MAX_STDERR_CHARS)
            )));
        }

        // Each line is a JSON event; text parts carry the completion
        let text: String = stdout
            .lines()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .filter(|event| event.get("type").and_then(|v| v.as_str()) == Some("text"))
            .filter_map(|event| {
                event
                    .get("part")
                    .and_then(|p| p.get("text"))
                    .and_then(|t| t.as_str())
                    .map(str::to_string)
            })
            .collect();

        non_empty(text)
    }
}

/// Falls back to simulated output when the primary executor is unavailable.
pub struct FallbackExecutor {
    primary: Arc<dyn PatternExecutor>,
    simulator: SimulatedExecutor,
}

impl FallbackExecutor {
    pub fn new(primary: Arc<dyn PatternExecutor>) -> Self {
        Self {
            primary,
            simulator: SimulatedExecutor,
        }
    }
}

impl PatternExecutor for FallbackExecutor {
    fn execute(
        &self,
        artifact: &PatternArtifact,
        sample: &SampleInput,
    ) -> Result<String, ExecutionError> {
        self.run(artifact, sample).map(|output| output.text)
    }

    fn run(
        &self,
        artifact: &PatternArtifact,
        sample: &SampleInput,
    ) -> Result<ExecutionOutput, ExecutionError> {
        match self.primary.run(artifact, sample) {
            Err(ExecutionError::Unavailable(reason)) => {
                warn!("{}; using simulated output for '{}'", reason, sample.id);
                self.simulator.run(artifact, sample)
            }
            other => other,
        }
    }
}

/// Replays previously captured outputs keyed by sample id.
#[derive(Debug, Clone, Default)]
pub struct RecordedExecutor {
    outputs: HashMap<String, String>,
}

impl RecordedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, sample_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.outputs.insert(sample_id.into(), text.into());
        self
    }

    pub fn insert(&mut self, sample_id: impl Into<String>, text: impl Into<String>) {
        self.outputs.insert(sample_id.into(), text.into());
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl PatternExecutor for RecordedExecutor {
    fn execute(
        &self,
        _artifact: &PatternArtifact,
        sample: &SampleInput,
    ) -> Result<String, ExecutionError> {
        self.outputs
            .get(&sample.id)
            .cloned()
            .ok_or_else(|| {
                ExecutionError::Unavailable(format!("no recorded output for '{}'", sample.id))
            })
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> ExecutionError {
    if err.kind() == ErrorKind::NotFound {
        ExecutionError::Unavailable(format!("{} CLI not found", program))
    } else {
        ExecutionError::Failed(format!("Failed to run {} CLI: {}", program, err))
    }
}

fn non_empty(text: String) -> Result<String, ExecutionError> {
    if text.trim().is_empty() {
        Err(ExecutionError::EmptyOutput)
    } else {
        Ok(text)
    }
}

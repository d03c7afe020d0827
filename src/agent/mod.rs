// Debug agent - the operations the CLI exposes
//
// Wraps the repair loop, the completion backend and the workspace. Nothing in
// here prints or prompts: callers get reports back and decide what to show,
// and whether to write anything.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::classifier::trim_traceback;
use crate::config::Config;
use crate::executor::{CodeExecutor, ExecutionResult, Executor};
use crate::metrics::{MetricsLogger, RepairMetric};
use crate::prompts::{build_prompt, extract_code, Task};
use crate::providers::{collect_stream, create_provider, CompletionProvider};
use crate::repair::{ProgressObserver, RepairLoop, RepairOutcome};
use crate::workspace::Workspace;

/// Result of `fix_file`
#[derive(Debug, Clone)]
pub struct FixReport {
    pub path: PathBuf,
    pub outcome: RepairOutcome,
}

impl FixReport {
    /// Fixed source, if there is something worth writing back
    pub fn fixed_source(&self) -> Option<&str> {
        self.outcome.fixed_source()
    }
}

/// Result of `create`
#[derive(Debug, Clone)]
pub struct CreateReport {
    pub code: String,
    /// Trial run of the generated code
    pub run: ExecutionResult,
}

impl CreateReport {
    pub fn works(&self) -> bool {
        self.run.succeeded
    }
}

pub struct DebugAgent {
    executor: Arc<dyn Executor>,
    provider: Arc<dyn CompletionProvider>,
    workspace: Workspace,
    metrics: Option<MetricsLogger>,
    observer: Option<ProgressObserver>,
    max_attempts: u32,
    streaming: bool,
}

impl DebugAgent {
    pub fn new(
        executor: Arc<dyn Executor>,
        provider: Arc<dyn CompletionProvider>,
        workspace: Workspace,
    ) -> Self {
        Self {
            executor,
            provider,
            workspace,
            metrics: None,
            observer: None,
            max_attempts: crate::config::constants::DEFAULT_MAX_ATTEMPTS,
            streaming: true,
        }
    }

    /// Build an agent from configuration: real executor, configured provider,
    /// workspace at the current directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let workspace = Workspace::current()?;
        let executor = CodeExecutor::new(config.executor.timeout_seconds)
            .with_interpreter(config.executor.interpreter.clone())
            .with_working_dir(workspace.base_dir());
        let provider = create_provider(config)?;

        let metrics = if config.features.metrics_enabled {
            match MetricsLogger::new(config.metrics_dir.clone()) {
                Ok(logger) => Some(logger),
                Err(e) => {
                    warn!("Metrics disabled: {:#}", e);
                    None
                }
            }
        } else {
            None
        };

        let mut agent = Self::new(Arc::new(executor), provider, workspace)
            .with_max_attempts(config.repair.max_attempts)
            .with_streaming(config.features.streaming_enabled);
        agent.metrics = metrics;
        Ok(agent)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsLogger) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn metrics(&self) -> Option<&MetricsLogger> {
        self.metrics.as_ref()
    }

    pub fn provider(&self) -> &dyn CompletionProvider {
        self.provider.as_ref()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Ask the backend whether the model is there. Unreachable counts as
    /// unavailable; the error is logged, not returned.
    pub async fn check_model(&self) -> bool {
        match self.provider.check_available().await {
            Ok(available) => available,
            Err(e) => {
                warn!("Availability check failed: {}", e);
                false
            }
        }
    }

    fn repair_loop(&self) -> RepairLoop {
        let repair_loop = RepairLoop::new(self.executor.clone(), self.provider.clone());
        match &self.observer {
            Some(observer) => repair_loop.with_observer(observer.clone()),
            None => repair_loop,
        }
    }

    async fn run_repair(&self, mode: &str, source: &str) -> RepairOutcome {
        let started = Instant::now();
        let outcome = self.repair_loop().repair(source, self.max_attempts).await;
        self.record(mode, &outcome, started);
        outcome
    }

    fn record(&self, mode: &str, outcome: &RepairOutcome, started: Instant) {
        if let Some(metrics) = &self.metrics {
            let metric = RepairMetric::from_outcome(mode, self.provider.model(), outcome, started.elapsed());
            if let Err(e) = metrics.log(&metric) {
                warn!("Failed to log metric: {:#}", e);
            }
        }
    }

    /// Run the fix loop on a file. The file itself is executed in place;
    /// nothing is written, see `apply_fix`.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn fix_file(&self, path: &Path) -> Result<FixReport> {
        let path = self.workspace.resolve(path);
        let source = self.workspace.read_source(&path)?;

        let started = Instant::now();
        let outcome = self
            .repair_loop()
            .repair_file(&path, &source, self.max_attempts)
            .await;
        self.record("fix", &outcome, started);

        Ok(FixReport { path, outcome })
    }

    /// Write a verified fix back, keeping a .bak copy of the original.
    pub fn apply_fix(&self, report: &FixReport) -> Result<Option<PathBuf>> {
        let Some(fixed) = report.fixed_source() else {
            bail!("No verified fix to apply for {}", report.path.display());
        };
        let mut content = fixed.to_string();
        if !content.ends_with('\n') {
            content.push('\n');
        }
        self.workspace.write_with_backup(&report.path, &content)
    }

    /// Run inline code; on failure, try to repair it.
    pub async fn debug_inline(&self, code: &str) -> RepairOutcome {
        self.run_repair("inline", code).await
    }

    /// List likely issues, passing text to `on_delta` as it arrives.
    pub async fn analyze<F>(&self, code: &str, on_delta: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let prompt = build_prompt(Task::Analyze, code, None);
        self.ask(&prompt, on_delta).await
    }

    /// Explain an error in a couple of lines.
    pub async fn explain<F>(&self, code: &str, error: &str, on_delta: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let prompt = build_prompt(Task::Explain, code, Some(&trim_traceback(error)));
        self.ask(&prompt, on_delta).await
    }

    /// Run a file and explain its error. `Ok(None)` when it runs clean.
    pub async fn explain_file<F>(&self, path: &Path, on_delta: F) -> Result<Option<String>>
    where
        F: FnMut(&str),
    {
        let path = self.workspace.resolve(path);
        let source = self.workspace.read_source(&path)?;
        let run = self.executor.execute_file(&path).await;
        if run.succeeded {
            return Ok(None);
        }
        self.explain(&source, &run.stderr, on_delta).await.map(Some)
    }

    /// Generate code for a description and give it a trial run.
    #[instrument(skip(self))]
    pub async fn create(&self, description: &str) -> Result<CreateReport> {
        let prompt = build_prompt(Task::Create, description, None);
        let response = self
            .provider
            .complete(&prompt)
            .await
            .context("Failed to generate code")?;

        let code = extract_code(&response);
        if code.trim().is_empty() {
            bail!("The model returned no code");
        }

        let run = self.executor.execute(&code).await;
        debug!(succeeded = run.succeeded, "Trial run of generated code");
        Ok(CreateReport { code, run })
    }

    /// Save generated code. Refuses to replace an existing file unless
    /// `overwrite` is set.
    pub fn save_created(&self, path: impl AsRef<Path>, code: &str, overwrite: bool) -> Result<PathBuf> {
        let mut content = code.to_string();
        if !content.ends_with('\n') {
            content.push('\n');
        }
        self.workspace.create_file(path, &content, overwrite)
    }

    async fn ask<F>(&self, prompt: &str, mut on_delta: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        if self.streaming {
            let rx = self.provider.complete_stream(prompt).await?;
            Ok(collect_stream(rx, on_delta).await?)
        } else {
            let text = self.provider.complete(prompt).await?;
            on_delta(&text);
            Ok(text)
        }
    }
}

// Fix-verify-retry loop
//
// execute -> classify -> ask for a fix -> execute the candidate -> accept or
// retry, up to a bound. Every step is awaited before the next one starts.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::events::{ProgressObserver, RepairEvent};
use super::types::{RepairAttempt, RepairFailure, RepairOutcome};
use crate::classifier::{classify, trim_traceback};
use crate::executor::{ExecutionResult, Executor};
use crate::prompts::{build_prompt, extract_code, retry_error_context, Task};
use crate::providers::CompletionProvider;

const NO_CODE_NOTE: &str =
    "Your last reply contained no code. Reply with the complete corrected script in a ```python block.";

/// Drives repeated fix attempts against an executor and a completion backend
pub struct RepairLoop {
    executor: Arc<dyn Executor>,
    provider: Arc<dyn CompletionProvider>,
    observer: Option<ProgressObserver>,
}

impl RepairLoop {
    pub fn new(executor: Arc<dyn Executor>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            executor,
            provider,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn emit(&self, event: RepairEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }

    /// Run `source`; if it fails, try up to `max_attempts` model fixes.
    ///
    /// Never returns an error: service and spawn failures are reported in
    /// the outcome. `max_attempts` below 1 is treated as 1.
    #[instrument(skip(self, source), fields(provider = self.provider.name()))]
    pub async fn repair(&self, source: &str, max_attempts: u32) -> RepairOutcome {
        self.emit(RepairEvent::ExecutingOriginal);
        let original = self.executor.execute(source).await;
        self.repair_from(source, original, None, max_attempts).await
    }

    /// Like `repair`, for a script on disk. The original runs in place and
    /// candidates run from scratch files beside it, so imports of sibling
    /// modules and `__file__`-relative paths behave as they do for `path`.
    #[instrument(skip(self, source), fields(provider = self.provider.name(), path = %path.display()))]
    pub async fn repair_file(&self, path: &Path, source: &str, max_attempts: u32) -> RepairOutcome {
        self.emit(RepairEvent::ExecutingOriginal);
        let original = self.executor.execute_file(path).await;
        self.repair_from(source, original, Some(path), max_attempts).await
    }

    async fn run_candidate(&self, candidate: &str, target: Option<&Path>) -> ExecutionResult {
        match target {
            Some(path) => self.executor.execute_beside(candidate, path).await,
            None => self.executor.execute(candidate).await,
        }
    }

    async fn repair_from(
        &self,
        source: &str,
        original: ExecutionResult,
        target: Option<&Path>,
        max_attempts: u32,
    ) -> RepairOutcome {
        let max_attempts = max_attempts.max(1);

        if original.succeeded {
            debug!("Original source ran clean");
            self.emit(RepairEvent::OriginalSucceeded);
            return RepairOutcome::clean(source, original);
        }

        if original.is_spawn_failure() {
            warn!(stderr = %original.stderr, "Could not start interpreter");
            let explanation = original.stderr.clone();
            return RepairOutcome::failed(
                source,
                original,
                None,
                RepairFailure::SpawnFailure,
                explanation,
                1,
                None,
            );
        }

        let error_record = classify(&original.stderr);
        info!(kind = %error_record.kind, line = ?error_record.source_line, "Error detected");
        self.emit(RepairEvent::ErrorDetected {
            record: error_record.clone(),
        });

        let mut current_source = source.to_string();
        let mut current_error = trim_traceback(&original.stderr);
        let mut last_candidate: Option<String> = None;
        // Set when the previous reply had no code; current_error is kept as is
        let mut missing_code = false;

        for attempt in 1..=max_attempts {
            self.emit(RepairEvent::RequestingFix {
                attempt,
                max_attempts,
            });

            let error_context = if missing_code {
                format!("{}\n\n{}", current_error, NO_CODE_NOTE)
            } else {
                current_error.clone()
            };
            let prompt = build_prompt(Task::Fix, &current_source, Some(&error_context));
            let response = match self.provider.complete(&prompt).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(attempt, error = %e, "Completion request failed");
                    return RepairOutcome::failed(
                        source,
                        original,
                        Some(error_record),
                        RepairFailure::Service,
                        e.to_string(),
                        attempt,
                        last_candidate,
                    );
                }
            };

            let candidate = extract_code(&response);
            if candidate.trim().is_empty() {
                debug!(attempt, "Model reply contained no code");
                self.emit(RepairEvent::EmptyCandidate { attempt });
                missing_code = true;
                continue;
            }
            missing_code = false;

            self.emit(RepairEvent::VerifyingCandidate { attempt });
            let result = self.run_candidate(&candidate, target).await;

            self.emit(RepairEvent::AttemptFinished {
                attempt: RepairAttempt {
                    attempt_number: attempt,
                    candidate_source: candidate.clone(),
                    verified: result.succeeded,
                },
                result: result.clone(),
            });

            if result.succeeded {
                info!(attempt, "Candidate verified");
                return RepairOutcome::fixed(source, original, error_record, candidate, attempt);
            }

            if result.is_spawn_failure() {
                warn!(attempt, stderr = %result.stderr, "Could not start interpreter for candidate");
                return RepairOutcome::failed(
                    source,
                    original,
                    Some(error_record),
                    RepairFailure::SpawnFailure,
                    result.stderr,
                    attempt,
                    Some(candidate),
                );
            }

            debug!(attempt, kind = %classify(&result.stderr).kind, "Candidate still fails");
            current_error = retry_error_context(&trim_traceback(&result.stderr));
            current_source = candidate.clone();
            last_candidate = Some(candidate);
        }

        warn!(max_attempts, "No working fix found");
        RepairOutcome::failed(
            source,
            original,
            Some(error_record),
            RepairFailure::Exhausted,
            format!("Could not produce a working fix after {} attempts", max_attempts),
            max_attempts,
            last_candidate,
        )
    }
}

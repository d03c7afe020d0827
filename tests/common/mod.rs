// Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mender::executor::{ExecutionResult, Executor};
use mender::providers::{CompletionProvider, ProviderError};

pub const NAME_ERROR: &str = "Traceback (most recent call last):\n  File \"script.py\", line 3, in <module>\n    print(undefined_variable)\nNameError: name 'undefined_variable' is not defined\n";

/// Replies from a script, in order. Once the script runs out the last reply
/// repeats.
#[derive(Clone)]
pub struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    fallback: String,
    pub calls: Arc<AtomicUsize>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let replies: Vec<String> = replies.into_iter().map(Into::into).collect();
        let fallback = replies.last().cloned().unwrap_or_default();
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().map(Ok).collect())),
            fallback,
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every request fails as if the backend were down
    pub fn unreachable() -> Self {
        let provider = Self::new(Vec::<String>::new());
        provider
            .replies
            .lock()
            .unwrap()
            .push_back(Err(ProviderError::Status {
                provider: "scripted".into(),
                status: 503,
                body: "down".into(),
            }));
        provider
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None if self.fallback.is_empty() => Err(ProviderError::EmptyResponse {
                provider: "scripted".into(),
            }),
            None => Ok(self.fallback.clone()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Decides each run by a rule over the source and records what it ran
#[derive(Clone)]
pub struct ScriptedExecutor {
    rule: Arc<dyn Fn(&str) -> ExecutionResult + Send + Sync>,
    pub calls: Arc<AtomicUsize>,
    pub sources: Arc<Mutex<Vec<String>>>,
    /// Paths run in place, then targets candidates were run beside
    pub in_place: Arc<Mutex<Vec<PathBuf>>>,
    pub beside: Arc<Mutex<Vec<PathBuf>>>,
}

impl ScriptedExecutor {
    pub fn new(rule: impl Fn(&str) -> ExecutionResult + Send + Sync + 'static) -> Self {
        Self {
            rule: Arc::new(rule),
            calls: Arc::new(AtomicUsize::new(0)),
            sources: Arc::new(Mutex::new(Vec::new())),
            in_place: Arc::new(Mutex::new(Vec::new())),
            beside: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Succeeds iff the source contains `marker`; otherwise a NameError
    pub fn passes_when_contains(marker: &'static str) -> Self {
        Self::new(move |source| {
            if source.contains(marker) {
                ExecutionResult::exited(Some(0), "ok\n".into(), String::new())
            } else {
                name_error()
            }
        })
    }

    pub fn always_fails() -> Self {
        Self::new(|_| name_error())
    }

    pub fn cannot_spawn() -> Self {
        Self::new(|_| ExecutionResult::spawn_failed("No such file or directory (os error 2)"))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn ran(&self, source: &str) -> bool {
        self.sources.lock().unwrap().iter().any(|s| s == source)
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&self, source: &str) -> ExecutionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sources.lock().unwrap().push(source.to_string());
        (self.rule)(source)
    }

    async fn execute_file(&self, path: &Path) -> ExecutionResult {
        self.in_place.lock().unwrap().push(path.to_path_buf());
        let source = std::fs::read_to_string(path).unwrap_or_default();
        self.execute(&source).await
    }

    async fn execute_beside(&self, source: &str, target: &Path) -> ExecutionResult {
        self.beside.lock().unwrap().push(target.to_path_buf());
        self.execute(source).await
    }
}

pub fn name_error() -> ExecutionResult {
    ExecutionResult::exited(Some(1), String::new(), NAME_ERROR.to_string())
}

pub fn fenced(code: &str) -> String {
    format!("Here is the fix:\n\n```python\n{}\n```\n", code)
}

pub fn python_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// Code executor - runs Python source in a child process with a wall-clock bound

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::registry::{kill_process_group, RunRegistry};
use super::types::ExecutionResult;
use super::Executor;
use crate::config::constants::{DEFAULT_INTERPRETER, DEFAULT_TIMEOUT_SECS, SCRATCH_PREFIX};

/// Runs a script as an isolated child process.
///
/// Each call writes the source to its own uniquely named scratch file, which
/// is removed when the call returns, whatever the outcome. The child runs in
/// its own process group so a timeout or an interrupt can take down anything
/// it spawned.
#[derive(Debug, Clone)]
pub struct CodeExecutor {
    interpreter: String,
    timeout: Duration,
    working_dir: Option<PathBuf>,
    registry: RunRegistry,
}

impl CodeExecutor {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            timeout: Duration::from_secs(timeout_secs),
            working_dir: None,
            registry: RunRegistry::global().clone(),
        }
    }

    /// Use a different interpreter binary (e.g. `python3.12` or a venv path)
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Run children from this directory so relative paths in scripts resolve
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Track children in `registry` instead of the process-wide one
    pub fn with_registry(mut self, registry: RunRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute source text with an explicit timeout.
    #[instrument(skip(self, source), fields(bytes = source.len(), timeout_secs = timeout.as_secs()))]
    pub async fn execute_with_timeout(&self, source: &str, timeout: Duration) -> ExecutionResult {
        self.execute_scratch(source, None, timeout).await
    }

    /// Execute source text from a scratch file created in `dir`, so the
    /// script sees the same neighbouring modules as a file living there.
    #[instrument(skip(self, source), fields(bytes = source.len(), dir = %dir.display()))]
    pub async fn execute_in_dir(&self, source: &str, dir: &Path) -> ExecutionResult {
        self.execute_scratch(source, Some(dir), self.timeout).await
    }

    async fn execute_scratch(&self, source: &str, dir: Option<&Path>, timeout: Duration) -> ExecutionResult {
        // Dropping the handle deletes the file, on every path out of this function.
        let scratch = match write_scratch(source, dir) {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to prepare scratch file: {}", e);
                return ExecutionResult::spawn_failed(format!("could not write scratch file: {}", e));
            }
        };

        debug!(path = %scratch.path().display(), "Wrote scratch file");
        self.run(scratch.path(), true, timeout).await
    }

    /// Execute an existing file in place.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn execute_file_in_place(&self, path: &Path) -> ExecutionResult {
        self.run(path, false, self.timeout).await
    }

    async fn run(&self, script: &Path, is_scratch: bool, timeout: Duration) -> ExecutionResult {
        let mut command = Command::new(&self.interpreter);
        command
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        #[cfg(unix)]
        command.process_group(0);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(interpreter = %self.interpreter, "Failed to spawn interpreter: {}", e);
                return ExecutionResult::spawn_failed(format!(
                    "failed to start '{}': {}",
                    self.interpreter, e
                ));
            }
        };

        let pid = child.id();
        // Unregisters on every path out; kills the group if this future is dropped
        let active = self
            .registry
            .track(pid, is_scratch.then(|| script.to_path_buf()));

        let result = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let result = ExecutionResult::exited(
                    output.status.code(),
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                );
                debug!(status = ?result.status, "Execution finished");
                result
            }
            Ok(Err(e)) => {
                warn!("Failed to collect child output: {}", e);
                ExecutionResult::spawn_failed(format!("failed to collect output: {}", e))
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "Execution timed out, killing process group");
                kill_process_group(pid);
                ExecutionResult::timed_out(timeout.as_secs())
            }
        };

        active.finish();
        result
    }
}

impl Default for CodeExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_SECS)
    }
}

#[async_trait]
impl Executor for CodeExecutor {
    async fn execute(&self, source: &str) -> ExecutionResult {
        self.execute_with_timeout(source, self.timeout).await
    }

    async fn execute_file(&self, path: &Path) -> ExecutionResult {
        self.execute_file_in_place(path).await
    }

    async fn execute_beside(&self, source: &str, target: &Path) -> ExecutionResult {
        match target.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => self.execute_in_dir(source, dir).await,
            None => self.execute(source).await,
        }
    }
}

fn write_scratch(source: &str, dir: Option<&Path>) -> std::io::Result<tempfile::NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_PREFIX).suffix(".py");
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(source.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionStatus;
    use std::time::Instant;

    fn python_available() -> bool {
        std::process::Command::new(DEFAULT_INTERPRETER)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_successful_script_captures_stdout() {
        if !python_available() {
            return;
        }
        let executor = CodeExecutor::new(10);
        let result = executor.execute("print('hello from child')").await;
        assert!(result.succeeded, "stderr: {}", result.stderr);
        assert_eq!(result.stdout.trim(), "hello from child");
        assert_eq!(result.status, ExecutionStatus::Exited(0));
    }

    #[tokio::test]
    async fn test_failing_script_captures_traceback() {
        if !python_available() {
            return;
        }
        let executor = CodeExecutor::new(10);
        let result = executor.execute("x = 1 / 0").await;
        assert!(!result.succeeded);
        assert_eq!(result.exit_code(), Some(1));
        assert!(result.stderr.contains("ZeroDivisionError"));
    }

    #[tokio::test]
    async fn test_infinite_loop_times_out_quickly() {
        if !python_available() {
            return;
        }
        let executor = CodeExecutor::new(1);
        let start = Instant::now();
        let result = executor.execute("while True:\n    pass\n").await;
        assert!(!result.succeeded);
        assert!(result.is_timeout());
        assert!(result.stderr.contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_reported_not_raised() {
        let executor = CodeExecutor::new(5).with_interpreter("definitely-not-a-python-binary");
        let result = executor.execute("print(1)").await;
        assert!(!result.succeeded);
        assert!(result.is_spawn_failure());
        assert!(result.stderr.contains("definitely-not-a-python-binary"));
    }

    #[tokio::test]
    async fn test_scratch_file_is_removed_after_run() {
        if !python_available() {
            return;
        }
        let executor = CodeExecutor::new(10);
        let result = executor.execute("import sys; print(sys.argv[0])").await;
        assert!(result.succeeded, "stderr: {}", result.stderr);

        let scratch = PathBuf::from(result.stdout.trim());
        assert!(scratch
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(SCRATCH_PREFIX)));
        assert!(!scratch.exists(), "scratch file should be deleted");
    }

    #[tokio::test]
    async fn test_working_dir_is_applied() {
        if !python_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.txt"), "payload").unwrap();

        let executor = CodeExecutor::new(10).with_working_dir(dir.path());
        let result = executor
            .execute("print(open('data.txt').read())")
            .await;
        assert!(result.succeeded, "stderr: {}", result.stderr);
        assert_eq!(result.stdout.trim(), "payload");
    }

    #[tokio::test]
    async fn test_execute_file_runs_in_place() {
        if !python_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("broken.py");
        std::fs::write(&script, "import sys\nprint(sys.argv[0])\nraise ValueError('bad')\n").unwrap();

        let executor = CodeExecutor::new(10);
        let result = executor.execute_file(&script).await;
        assert!(!result.succeeded);
        assert_eq!(PathBuf::from(result.stdout.trim()), script);
        assert!(result.stderr.contains("ValueError: bad"));
    }

    #[tokio::test]
    async fn test_execute_beside_sees_sibling_modules() {
        if !python_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("helpers.py"), "GREETING = 'hi from helpers'\n").unwrap();
        let target = dir.path().join("main.py");

        let executor = CodeExecutor::new(10);
        let result = executor
            .execute_beside("from helpers import GREETING\nprint(GREETING)\n", &target)
            .await;
        assert!(result.succeeded, "stderr: {}", result.stderr);
        assert_eq!(result.stdout.trim(), "hi from helpers");

        // Only the sibling module is left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(SCRATCH_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_interrupt_stops_running_child_and_removes_scratch() {
        if !python_available() {
            return;
        }
        let registry = RunRegistry::default();
        let executor = CodeExecutor::new(30).with_registry(registry.clone());

        let start = Instant::now();
        let run = tokio::spawn(async move { executor.execute("while True:\n    pass\n").await });

        while registry.is_empty() {
            assert!(start.elapsed() < Duration::from_secs(10), "child never registered");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let scratch = registry.scratch_files();
        assert_eq!(scratch.len(), 1);
        assert!(scratch[0].exists());

        assert_eq!(registry.interrupt_all(), 1);
        assert!(!scratch[0].exists());

        let result = run.await.unwrap();
        assert!(!result.succeeded);
        assert!(!result.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_run_is_unregistered() {
        if !python_available() {
            return;
        }
        let registry = RunRegistry::default();
        let executor = CodeExecutor::new(30).with_registry(registry.clone());

        let abandoned = tokio::time::timeout(
            Duration::from_millis(500),
            executor.execute("import time\ntime.sleep(30)\n"),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(registry.is_empty());
    }
}

// Execution result types

use serde::{Deserialize, Serialize};

/// How a child process run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "code", rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Process exited on its own with this status code
    Exited(i32),
    /// Process was ended by a signal it did not raise through our timeout
    Terminated,
    /// Process exceeded the wall-clock bound and was killed
    TimedOut,
    /// Process could not be started at all (missing interpreter, scratch I/O, ...)
    SpawnFailed,
}

/// Outcome of one execution attempt. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// True iff the process exited with status 0
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
    pub status: ExecutionStatus,
}

impl ExecutionResult {
    /// Build a result from a finished process
    pub fn exited(code: Option<i32>, stdout: String, stderr: String) -> Self {
        let status = match code {
            Some(code) => ExecutionStatus::Exited(code),
            None => ExecutionStatus::Terminated,
        };

        Self {
            succeeded: code == Some(0),
            stdout,
            stderr,
            status,
        }
    }

    /// Build the result reported when the wall-clock bound is exceeded
    pub fn timed_out(timeout_secs: u64) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: format!("Execution timed out after {} seconds", timeout_secs),
            status: ExecutionStatus::TimedOut,
        }
    }

    /// Build the result reported when the process could not be started
    pub fn spawn_failed(diagnostic: impl std::fmt::Display) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: format!("Execution error: {}", diagnostic),
            status: ExecutionStatus::SpawnFailed,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.status == ExecutionStatus::TimedOut
    }

    pub fn is_spawn_failure(&self) -> bool {
        self.status == ExecutionStatus::SpawnFailed
    }

    /// Exit code, when the process exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            ExecutionStatus::Exited(code) => Some(code),
            _ => None,
        }
    }
}

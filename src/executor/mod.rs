// Script execution
//
// The `Executor` trait is the seam the repair loop depends on; `CodeExecutor`
// is the real child-process implementation.

use async_trait::async_trait;
use std::path::Path;

mod registry;
mod runner;
mod types;

pub use registry::RunRegistry;
pub use runner::CodeExecutor;
pub use types::{ExecutionResult, ExecutionStatus};

/// Runs source text once and reports what happened.
///
/// Implementations never return an error: spawn problems and timeouts are
/// folded into a failed `ExecutionResult`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, source: &str) -> ExecutionResult;

    /// Run an existing script. The default reads it and runs the text.
    async fn execute_file(&self, path: &Path) -> ExecutionResult {
        match tokio::fs::read_to_string(path).await {
            Ok(source) => self.execute(&source).await,
            Err(e) => ExecutionResult::spawn_failed(format!("could not read {}: {}", path.display(), e)),
        }
    }

    /// Run source text as if it lived next to `target`, so imports of
    /// sibling modules resolve the same way. The default ignores `target`.
    async fn execute_beside(&self, source: &str, _target: &Path) -> ExecutionResult {
        self.execute(source).await
    }
}

// Prompt templates for the completion backend
//
// Kept short on purpose: the default backend is a small local model running
// on CPU, and long prompts cost more than they help.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod extract;

pub use extract::extract_code;

/// What we are asking the model to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Fix,
    Analyze,
    Create,
    Explain,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Fix => "fix",
            Task::Analyze => "analyze",
            Task::Create => "create",
            Task::Explain => "explain",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fix" => Ok(Task::Fix),
            "analyze" | "analyse" => Ok(Task::Analyze),
            "create" => Ok(Task::Create),
            "explain" => Ok(Task::Explain),
            other => Err(format!("unknown task '{}'", other)),
        }
    }
}

/// Build the prompt for a task.
///
/// For `Task::Create`, `code` is the plain-language description of what to
/// build. `error` is only used by `Fix` and `Explain`.
pub fn build_prompt(task: Task, code: &str, error: Option<&str>) -> String {
    let error = error.unwrap_or("(no error output)");

    match task {
        Task::Fix => format!(
            "Fix this Python code. The code has an error.\n\n\
             Code:\n```python\n{code}\n```\n\n\
             Error:\n{error}\n\n\
             Provide ONLY the corrected Python code without explanations. \
             Start directly with the code."
        ),
        Task::Analyze => format!(
            "Analyze this Python code and identify issues.\n\n\
             Code:\n```python\n{code}\n```\n\n\
             List issues briefly:\n1. \n2. \n3. "
        ),
        Task::Create => format!(
            "Create Python code for: {code}\n\n\
             Requirements:\n\
             - Complete, working code\n\
             - Include error handling\n\
             - Add brief comments\n\n\
             Provide ONLY the code."
        ),
        Task::Explain => format!(
            "Explain this error briefly:\n\n\
             Error:\n{error}\n\n\
             Code:\n```python\n{code}\n```\n\n\
             Provide:\n\
             1. What caused it (1 line)\n\
             2. How to fix it (1 line)"
        ),
    }
}

/// Error text for a follow-up fix request, after a candidate already failed
pub fn retry_error_context(stderr: &str) -> String {
    format!("Previous fix failed with:\n{}", stderr)
}

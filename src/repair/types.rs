// Repair loop result types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classifier::ErrorRecord;
use crate::executor::ExecutionResult;

/// One pass through the fix-verify cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairAttempt {
    /// 1-based
    pub attempt_number: u32,
    pub candidate_source: String,
    /// True only if the candidate was executed and exited 0
    pub verified: bool,
}

/// Why a repair ended without a verified fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairFailure {
    /// The completion backend failed (unreachable, bad status, empty reply)
    Service,
    /// The interpreter could not be started; retrying is pointless
    SpawnFailure,
    /// Every attempt produced a candidate that still failed
    Exhausted,
}

impl RepairFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairFailure::Service => "service",
            RepairFailure::SpawnFailure => "spawn_failure",
            RepairFailure::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for RepairFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one `repair` call. Not persisted by the loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairOutcome {
    /// Whether the original source failed
    pub had_error: bool,
    pub original_source: String,
    /// Run of the original source (stdout is shown by inline debugging)
    pub original_run: ExecutionResult,
    /// Only set when this source was executed and succeeded
    pub final_source: Option<String>,
    /// Classification of the original failure
    pub error_record: Option<ErrorRecord>,
    /// Human-readable reason when no fix was verified
    pub explanation: Option<String>,
    pub verified: bool,
    /// Completion requests made (0 when the original ran clean)
    pub attempts: u32,
    pub failure: Option<RepairFailure>,
    /// Last candidate that was tried and failed, if any
    pub last_candidate: Option<String>,
}

impl RepairOutcome {
    pub(crate) fn clean(source: &str, run: ExecutionResult) -> Self {
        Self {
            had_error: false,
            original_source: source.to_string(),
            original_run: run,
            final_source: Some(source.to_string()),
            error_record: None,
            explanation: None,
            verified: true,
            attempts: 0,
            failure: None,
            last_candidate: None,
        }
    }

    pub(crate) fn fixed(
        source: &str,
        run: ExecutionResult,
        error_record: ErrorRecord,
        candidate: String,
        attempts: u32,
    ) -> Self {
        Self {
            had_error: true,
            original_source: source.to_string(),
            original_run: run,
            final_source: Some(candidate),
            error_record: Some(error_record),
            explanation: None,
            verified: true,
            attempts,
            failure: None,
            last_candidate: None,
        }
    }

    pub(crate) fn failed(
        source: &str,
        run: ExecutionResult,
        error_record: Option<ErrorRecord>,
        failure: RepairFailure,
        explanation: String,
        attempts: u32,
        last_candidate: Option<String>,
    ) -> Self {
        Self {
            had_error: true,
            original_source: source.to_string(),
            original_run: run,
            final_source: None,
            error_record,
            explanation: Some(explanation),
            verified: false,
            attempts,
            failure: Some(failure),
            last_candidate,
        }
    }

    /// A fix was produced and verified (clean originals don't count)
    pub fn is_fixed(&self) -> bool {
        self.had_error && self.verified
    }

    /// Source that changed and is safe to write back
    pub fn fixed_source(&self) -> Option<&str> {
        if self.is_fixed() {
            self.final_source.as_deref()
        } else {
            None
        }
    }

    /// Error kind of the original failure, if classified
    pub fn error_kind(&self) -> Option<&str> {
        self.error_record.as_ref().map(|r| r.kind.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing_run() -> ExecutionResult {
        ExecutionResult::exited(Some(1), String::new(), "NameError: x".into())
    }

    #[test]
    fn test_clean_outcome() {
        let outcome = RepairOutcome::clean("print(1)", ExecutionResult::exited(Some(0), "1\n".into(), String::new()));
        assert!(!outcome.had_error);
        assert!(outcome.verified);
        assert!(!outcome.is_fixed());
        assert_eq!(outcome.final_source.as_deref(), Some("print(1)"));
        assert!(outcome.fixed_source().is_none());
    }

    #[test]
    fn test_failed_outcome_has_no_final_source() {
        let outcome = RepairOutcome::failed(
            "print(x)",
            failing_run(),
            None,
            RepairFailure::Exhausted,
            "gave up".into(),
            3,
            Some("print(y)".into()),
        );
        assert!(outcome.final_source.is_none());
        assert!(!outcome.verified);
        assert_eq!(outcome.last_candidate.as_deref(), Some("print(y)"));
        assert_eq!(outcome.failure, Some(RepairFailure::Exhausted));
    }

    #[test]
    fn test_fixed_outcome_exposes_source() {
        let record = crate::classifier::classify("NameError: x");
        let outcome = RepairOutcome::fixed("print(x)", failing_run(), record, "print(1)".into(), 1);
        assert!(outcome.is_fixed());
        assert_eq!(outcome.fixed_source(), Some("print(1)"));
        assert_eq!(outcome.error_kind(), Some("NameError"));
    }

    #[test]
    fn test_failure_serializes_snake_case() {
        let json = serde_json::to_string(&RepairFailure::SpawnFailure).unwrap();
        assert_eq!(json, "\"spawn_failure\"");
    }
}

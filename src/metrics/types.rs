// Metrics data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::logger::MetricsLogger;
use crate::repair::{RepairFailure, RepairOutcome};

/// One line of the daily metrics log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairMetric {
    /// Unique per logged run
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// SHA256 of the original source (the code itself is never logged)
    pub source_hash: String,
    /// "fix", "inline", ...
    pub mode: String,
    pub model: String,
    pub had_error: bool,
    pub verified: bool,
    pub attempts: u32,
    pub error_kind: Option<String>,
    pub failure: Option<RepairFailure>,
    pub duration_ms: u64,
}

impl RepairMetric {
    pub fn from_outcome(mode: &str, model: &str, outcome: &RepairOutcome, elapsed: Duration) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source_hash: MetricsLogger::hash_source(&outcome.original_source),
            mode: mode.to_string(),
            model: model.to_string(),
            had_error: outcome.had_error,
            verified: outcome.verified,
            attempts: outcome.attempts,
            error_kind: outcome.error_kind().map(str::to_string),
            failure: outcome.failure,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.had_error && self.verified
    }
}

/// Aggregate over one day of metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSummary {
    pub total: usize,
    /// Original failed, fix verified
    pub fixed: usize,
    /// Original failed, no verified fix
    pub failed: usize,
    /// Original ran clean
    pub clean: usize,
    /// Mean attempts over runs that needed a fix
    pub avg_attempts: f64,
    pub avg_duration_ms: u64,
    /// Most common error kinds, most frequent first
    pub top_error_kinds: Vec<(String, usize)>,
}

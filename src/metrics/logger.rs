// Metrics logger

use anyhow::{Context, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::types::{MetricsSummary, RepairMetric};

const TOP_ERROR_KINDS: usize = 3;

pub struct MetricsLogger {
    metrics_dir: PathBuf,
}

impl MetricsLogger {
    pub fn new(metrics_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&metrics_dir).with_context(|| {
            format!(
                "Failed to create metrics directory: {}",
                metrics_dir.display()
            )
        })?;

        Ok(Self { metrics_dir })
    }

    pub fn metrics_dir(&self) -> &Path {
        &self.metrics_dir
    }

    /// Append a repair metric to today's JSONL file
    pub fn log(&self, metric: &RepairMetric) -> Result<()> {
        let log_file = self.log_file(&metric.timestamp.format("%Y-%m-%d").to_string());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open metrics log: {}", log_file.display()))?;

        let json = serde_json::to_string(metric).context("Failed to serialize metric")?;

        writeln!(file, "{}", json).context("Failed to write metric to log")?;

        Ok(())
    }

    /// Hash source text (SHA256) so logs never contain code
    pub fn hash_source(source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Read metrics for a date formatted as YYYY-MM-DD
    pub fn read_metrics(&self, date: &str) -> Result<Vec<RepairMetric>> {
        let log_file = self.log_file(date);

        if !log_file.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&log_file)
            .with_context(|| format!("Failed to read metrics log: {}", log_file.display()))?;

        let metrics: Vec<RepairMetric> = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to parse metrics")?;

        Ok(metrics)
    }

    /// Summary statistics for today (UTC)
    pub fn today_summary(&self) -> Result<MetricsSummary> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        Ok(summarize(&self.read_metrics(&today)?))
    }

    fn log_file(&self, date: &str) -> PathBuf {
        self.metrics_dir.join(format!("{}.jsonl", date))
    }
}

pub fn summarize(metrics: &[RepairMetric]) -> MetricsSummary {
    let total = metrics.len();
    let clean = metrics.iter().filter(|m| !m.had_error).count();
    let fixed = metrics.iter().filter(|m| m.is_fixed()).count();
    let failed = total - clean - fixed;

    let needed_fix: Vec<&RepairMetric> = metrics.iter().filter(|m| m.had_error).collect();
    let avg_attempts = if needed_fix.is_empty() {
        0.0
    } else {
        needed_fix.iter().map(|m| m.attempts as f64).sum::<f64>() / needed_fix.len() as f64
    };

    let avg_duration_ms = if total > 0 {
        metrics.iter().map(|m| m.duration_ms).sum::<u64>() / total as u64
    } else {
        0
    };

    let mut kind_counts: HashMap<String, usize> = HashMap::new();
    for metric in metrics {
        if let Some(kind) = &metric.error_kind {
            *kind_counts.entry(kind.clone()).or_insert(0) += 1;
        }
    }

    let mut top_error_kinds: Vec<(String, usize)> = kind_counts.into_iter().collect();
    // Ties broken by name so output is stable
    top_error_kinds.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_error_kinds.truncate(TOP_ERROR_KINDS);

    MetricsSummary {
        total,
        fixed,
        failed,
        clean,
        avg_attempts,
        avg_duration_ms,
        top_error_kinds,
    }
}

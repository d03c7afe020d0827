// Metrics module
// Public interface for logging and summarizing repair metrics

mod logger;
mod types;

pub use logger::{summarize, MetricsLogger};
pub use types::{MetricsSummary, RepairMetric};

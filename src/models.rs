//! Core domain models for metric autohide

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::AppError;

/// Visibility status of a metric in the status index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    /// Regular, visible metric
    Simple,
    /// Banned by an operator
    Ban,
    /// Explicitly approved by an operator
    Approved,
    /// Hidden by an operator
    Hidden,
    /// Hidden by the autohide job
    AutoHidden,
}

impl MetricStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricStatus::Simple => "simple",
            MetricStatus::Ban => "ban",
            MetricStatus::Approved => "approved",
            MetricStatus::Hidden => "hidden",
            MetricStatus::AutoHidden => "auto_hidden",
        }
    }

    /// Statuses set by hand that automatic jobs must not overwrite
    pub fn is_handmade(&self) -> bool {
        matches!(
            self,
            MetricStatus::Ban | MetricStatus::Approved | MetricStatus::Hidden
        )
    }
}

impl fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric that matched the staleness filter in the current run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateMetric {
    /// Hierarchical metric path, e.g. `one_min.host.cpu.user`
    pub path: String,
    /// Total number of recorded points
    pub count: i64,
    /// Most recent point timestamp, epoch seconds
    pub last_timestamp: i64,
}

/// Summary of a successful autohide run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Metrics marked auto-hidden during the run
    pub hidden: u64,
    /// Number of `set_status` calls, including the final partial batch
    pub batches: u64,
}

/// Where in the run a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// The candidate query failed before yielding any row
    Query,
    /// The row stream broke after yielding at least one row
    Stream,
    /// The status index rejected or did not receive a batch
    Flush,
}

/// A run that was aborted. Batches flushed before the failure stay applied.
#[derive(Debug)]
pub struct RunFailure {
    pub run_id: Uuid,
    pub stage: FailureStage,
    /// Metrics hidden before the failure
    pub hidden: u64,
    /// Batches flushed before the failure
    pub batches: u64,
    pub error: AppError,
}

/// Result of one autohide run
pub type RunOutcome = std::result::Result<RunReport, RunFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(MetricStatus::Simple.as_str(), "simple");
        assert_eq!(MetricStatus::AutoHidden.as_str(), "auto_hidden");
        assert_eq!(MetricStatus::Ban.to_string(), "ban");
    }

    #[test]
    fn test_handmade_statuses() {
        assert!(MetricStatus::Ban.is_handmade());
        assert!(MetricStatus::Approved.is_handmade());
        assert!(MetricStatus::Hidden.is_handmade());
        assert!(!MetricStatus::Simple.is_handmade());
        assert!(!MetricStatus::AutoHidden.is_handmade());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&MetricStatus::AutoHidden).unwrap();
        assert_eq!(json, "\"auto_hidden\"");
    }
}

//! Prometheus metrics endpoint

use axum::{extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::models::{FailureStage, RunFailure, RunReport};
use crate::state::AppState;

/// Autohide job counters for Prometheus
#[derive(Default)]
pub struct Metrics {
    /// Completed runs, successful or not
    pub runs_total: AtomicU64,
    /// Runs aborted by a query, stream or flush failure
    pub runs_failed_total: AtomicU64,
    /// Metrics marked auto-hidden across all runs, including partial runs
    pub metrics_hidden_total: AtomicU64,
    last_run: RwLock<Option<LastRun>>,
}

/// Summary of the most recent run
#[derive(Debug, Clone, Serialize)]
pub struct LastRun {
    pub run_id: Uuid,
    pub finished_at: DateTime<Utc>,
    pub hidden: u64,
    pub batches: u64,
    pub succeeded: bool,
    pub failure_stage: Option<FailureStage>,
    pub error: Option<String>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, report: &RunReport) {
        self.runs_total.fetch_add(1, Ordering::Relaxed);
        self.metrics_hidden_total
            .fetch_add(report.hidden, Ordering::Relaxed);
        *self.last_run.write() = Some(LastRun {
            run_id: report.run_id,
            finished_at: report.finished_at,
            hidden: report.hidden,
            batches: report.batches,
            succeeded: true,
            failure_stage: None,
            error: None,
        });
    }

    pub fn record_failure(&self, failure: &RunFailure) {
        self.runs_total.fetch_add(1, Ordering::Relaxed);
        self.runs_failed_total.fetch_add(1, Ordering::Relaxed);
        self.metrics_hidden_total
            .fetch_add(failure.hidden, Ordering::Relaxed);
        *self.last_run.write() = Some(LastRun {
            run_id: failure.run_id,
            finished_at: Utc::now(),
            hidden: failure.hidden,
            batches: failure.batches,
            succeeded: false,
            failure_stage: Some(failure.stage),
            error: Some(failure.error.to_string()),
        });
    }

    pub fn last_run(&self) -> Option<LastRun> {
        self.last_run.read().clone()
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_total: self.runs_total.load(Ordering::Relaxed),
            runs_failed_total: self.runs_failed_total.load(Ordering::Relaxed),
            metrics_hidden_total: self.metrics_hidden_total.load(Ordering::Relaxed),
            last_run: self.last_run(),
        }
    }
}

#[derive(Debug)]
pub struct MetricsSnapshot {
    pub runs_total: u64,
    pub runs_failed_total: u64,
    pub metrics_hidden_total: u64,
    pub last_run: Option<LastRun>,
}

/// GET /metrics
///
/// Returns Prometheus-format metrics
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let output = render(&state.metrics.get_metrics(), state.autohide.enabled);

    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        output,
    )
}

fn render(snapshot: &MetricsSnapshot, enabled: bool) -> String {
    let (last_hidden, last_timestamp) = snapshot
        .last_run
        .as_ref()
        .map(|run| (run.hidden, run.finished_at.timestamp()))
        .unwrap_or((0, 0));

    format!(
        r#"# HELP autohide_runs_total Total number of autohide runs
# TYPE autohide_runs_total counter
autohide_runs_total {}

# HELP autohide_runs_failed_total Total number of autohide runs aborted by an error
# TYPE autohide_runs_failed_total counter
autohide_runs_failed_total {}

# HELP autohide_metrics_hidden_total Total number of metrics marked auto-hidden
# TYPE autohide_metrics_hidden_total counter
autohide_metrics_hidden_total {}

# HELP autohide_last_run_hidden Metrics hidden by the most recent run
# TYPE autohide_last_run_hidden gauge
autohide_last_run_hidden {}

# HELP autohide_last_run_timestamp_seconds Unix time the most recent run finished
# TYPE autohide_last_run_timestamp_seconds gauge
autohide_last_run_timestamp_seconds {}

# HELP autohide_enabled Whether the autohide job is scheduled
# TYPE autohide_enabled gauge
autohide_enabled {}

# HELP autohide_info Build information
# TYPE autohide_info gauge
autohide_info{{version="{}"}} 1
"#,
        snapshot.runs_total,
        snapshot.runs_failed_total,
        snapshot.metrics_hidden_total,
        last_hidden,
        last_timestamp,
        u8::from(enabled),
        env!("CARGO_PKG_VERSION"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn report(hidden: u64) -> RunReport {
        RunReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            hidden,
            batches: 1,
        }
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_success(&report(3));
        metrics.record_failure(&RunFailure {
            run_id: Uuid::new_v4(),
            stage: FailureStage::Flush,
            hidden: 2,
            batches: 1,
            error: AppError::DatabaseError("down".into()),
        });

        let snapshot = metrics.get_metrics();
        assert_eq!(snapshot.runs_total, 2);
        assert_eq!(snapshot.runs_failed_total, 1);
        assert_eq!(snapshot.metrics_hidden_total, 5);

        let last = snapshot.last_run.unwrap();
        assert!(!last.succeeded);
        assert_eq!(last.failure_stage, Some(FailureStage::Flush));
        assert_eq!(last.error.as_deref(), Some("Database error: down"));
    }

    #[test]
    fn test_render_before_first_run() {
        let output = render(&Metrics::new().get_metrics(), true);
        assert!(output.contains("autohide_runs_total 0\n"));
        assert!(output.contains("autohide_last_run_timestamp_seconds 0\n"));
        assert!(output.contains("autohide_enabled 1\n"));
    }

    #[test]
    fn test_render_last_run() {
        let metrics = Metrics::new();
        metrics.record_success(&report(42));
        let output = render(&metrics.get_metrics(), false);
        assert!(output.contains("autohide_last_run_hidden 42\n"));
        assert!(output.contains("autohide_metrics_hidden_total 42\n"));
        assert!(output.contains("autohide_enabled 0\n"));
    }
}

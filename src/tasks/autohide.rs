//! Autohide run - finds stale, sparse metrics and marks them auto-hidden

use chrono::Utc;
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::batch::PathBatch;
use crate::config::AutohideConfig;
use crate::error::AppError;
use crate::models::{FailureStage, MetricStatus, RunFailure, RunOutcome, RunReport};
use crate::store::{MetricStatusIndex, MetricsStore};

/// One pass of the autohide job over the whole metric catalogue.
///
/// Candidates are streamed from the store and flushed to the status index in
/// batches of `batch_size`, so memory stays bounded regardless of catalogue size.
#[derive(Clone)]
pub struct AutohideJob {
    config: AutohideConfig,
    store: Arc<dyn MetricsStore>,
    index: Arc<dyn MetricStatusIndex>,
}

/// Per-run progress, owned by a single run
struct RunState {
    run_id: Uuid,
    batch: PathBatch,
    hidden: u64,
    batches: u64,
    rows_seen: bool,
}

impl RunState {
    fn fail(&self, stage: FailureStage, error: AppError) -> RunFailure {
        RunFailure {
            run_id: self.run_id,
            stage,
            hidden: self.hidden,
            batches: self.batches,
            error,
        }
    }
}

impl AutohideJob {
    pub fn new(
        config: AutohideConfig,
        store: Arc<dyn MetricsStore>,
        index: Arc<dyn MetricStatusIndex>,
    ) -> Self {
        Self {
            config,
            store,
            index,
        }
    }

    pub fn config(&self) -> &AutohideConfig {
        &self.config
    }

    /// Execute a single run.
    ///
    /// Any error aborts the rest of the run. Batches flushed before the error are
    /// not rolled back.
    pub async fn run(&self) -> RunOutcome {
        let started_at = Utc::now();
        let mut state = RunState {
            run_id: Uuid::new_v4(),
            batch: PathBatch::new(self.config.batch_size),
            hidden: 0,
            batches: 0,
            rows_seen: false,
        };

        info!(
            run_id = %state.run_id,
            max_values_count = self.config.max_values_count,
            missing_days = self.config.missing_days,
            "Running autohide"
        );

        let mut rows = self
            .store
            .stale_candidates(self.config.max_values_count, self.config.missing_days);

        while let Some(row) = rows.next().await {
            let candidate = match row {
                Ok(candidate) => candidate,
                Err(e) => {
                    let stage = if state.rows_seen {
                        FailureStage::Stream
                    } else {
                        FailureStage::Query
                    };
                    return Err(state.fail(stage, e));
                }
            };
            state.rows_seen = true;

            trace!(
                path = %candidate.path,
                count = candidate.count,
                last_timestamp = candidate.last_timestamp,
                "Autohide candidate"
            );

            if state.batch.push(candidate.path) {
                self.flush(&mut state).await?;
                info!(
                    run_id = %state.run_id,
                    hidden = state.hidden,
                    "{} metrics hidden",
                    state.hidden
                );
            }
        }
        drop(rows);

        // The trailing batch is flushed even when empty.
        self.flush(&mut state).await?;

        info!(
            run_id = %state.run_id,
            hidden = state.hidden,
            batches = state.batches,
            "Autohide completed. {} metrics hidden",
            state.hidden
        );

        Ok(RunReport {
            run_id: state.run_id,
            started_at,
            finished_at: Utc::now(),
            hidden: state.hidden,
            batches: state.batches,
        })
    }

    async fn flush(&self, state: &mut RunState) -> Result<(), RunFailure> {
        if state.batch.is_empty() {
            debug!(run_id = %state.run_id, "Flushing empty final batch");
        }
        let paths = state.batch.take();
        if let Err(e) = self.index.set_status(&paths, MetricStatus::AutoHidden).await {
            return Err(state.fail(FailureStage::Flush, e));
        }
        state.hidden += paths.len() as u64;
        state.batches += 1;
        Ok(())
    }
}

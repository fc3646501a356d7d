//! Scheduler - fires the autohide job once a day on a single background task

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::routes::metrics::Metrics;
use crate::tasks::autohide::AutohideJob;

/// Spacing between runs after the first one
pub const RUN_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Starts the autohide timeline.
pub struct AutohideScheduler;

/// Owned handle to a running (or inert) autohide timeline.
#[derive(Debug)]
pub struct SchedulerHandle {
    inner: Option<Running>,
}

#[derive(Debug)]
struct Running {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AutohideScheduler {
    /// Schedule `job`: first run after the configured initial delay, then daily.
    ///
    /// Runs execute inline on one task, so a run that overruns pushes the next
    /// one back instead of overlapping it. When the job is disabled nothing is
    /// spawned and the returned handle is inert.
    pub fn start(job: AutohideJob, metrics: Arc<Metrics>) -> SchedulerHandle {
        if !job.config().enabled {
            info!("Autohide disabled");
            return SchedulerHandle { inner: None };
        }

        let initial_delay = job.config().initial_delay();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(job, metrics, initial_delay, stop_rx));

        info!(
            initial_delay_minutes = initial_delay.as_secs() / 60,
            period_minutes = RUN_PERIOD.as_secs() / 60,
            "Autohide scheduled"
        );

        SchedulerHandle {
            inner: Some(Running { stop_tx, task }),
        }
    }
}

impl SchedulerHandle {
    /// Whether a timeline was actually started
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// Cancel pending firings and wait up to `grace` for an in-flight run.
    ///
    /// A run still going after `grace` is abandoned.
    pub async fn stop(self, grace: Duration) {
        let Some(Running { stop_tx, mut task }) = self.inner else {
            return;
        };

        let _ = stop_tx.send(true);

        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(())) => info!("Autohide scheduler stopped"),
            Ok(Err(e)) => error!(error = %e, "Autohide scheduler task failed"),
            Err(_) => {
                warn!(
                    grace_secs = grace.as_secs(),
                    "Autohide run still in progress at shutdown, abandoning it"
                );
                task.abort();
            }
        }
    }
}

async fn run_loop(
    job: AutohideJob,
    metrics: Arc<Metrics>,
    initial_delay: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + initial_delay, RUN_PERIOD);
    // An overrun fires once right after the run ends, then the daily grid resumes.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // A stop request wins over a tick that is due at the same time.
            biased;
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        match job.run().await {
            Ok(report) => metrics.record_success(&report),
            Err(failure) => {
                error!(
                    run_id = %failure.run_id,
                    stage = ?failure.stage,
                    hidden = failure.hidden,
                    batches = failure.batches,
                    error = %failure.error,
                    "Failed to run autohide"
                );
                metrics.record_failure(&failure);
            }
        }

        if *stop_rx.borrow() {
            break;
        }
    }
}

//! Interfaces to the metrics store and the metric status index

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::Result;
use crate::models::{CandidateMetric, MetricStatus};

/// Read side: the time-series store holding raw points.
pub trait MetricsStore: Send + Sync {
    /// Stream every path with fewer than `max_values_count` points whose newest
    /// point is older than the store's current date minus `missing_days`.
    ///
    /// Filtering happens in the store. The stream is lazy and finite; rows are
    /// yielded as the store produces them.
    fn stale_candidates(
        &self,
        max_values_count: u32,
        missing_days: u32,
    ) -> BoxStream<'_, Result<CandidateMetric>>;
}

/// Write side: the index recording each path's visibility status.
#[async_trait]
pub trait MetricStatusIndex: Send + Sync {
    /// Set `status` on every path in `paths`. An empty slice is a no-op.
    async fn set_status(&self, paths: &[String], status: MetricStatus) -> Result<()>;
}

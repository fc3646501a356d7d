//! Database access layer with SQLx and PostgreSQL

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::{CandidateMetric, MetricStatus};
use crate::store::{MetricStatusIndex, MetricsStore};

const ALL_STATUSES: [MetricStatus; 5] = [
    MetricStatus::Simple,
    MetricStatus::Ban,
    MetricStatus::Approved,
    MetricStatus::Hidden,
    MetricStatus::AutoHidden,
];

/// Database connection pool and the two tables the job touches
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    candidates_sql: String,
    set_status_sql: String,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `connection_string` - PostgreSQL connection URL
    /// * `data_table` - Table with raw points (`path`, `timestamp` in epoch seconds)
    /// * `status_table` - Table with per-path status (`path` primary key)
    pub async fn new(connection_string: &str, data_table: &str, status_table: &str) -> Result<Self> {
        validate_identifier(data_table)?;
        validate_identifier(status_table)?;

        // One connection holds the candidate cursor while another applies flushes.
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(connection_string)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        info!("Database connection pool established");
        Ok(Self::with_pool(pool, data_table, status_table))
    }

    fn with_pool(pool: PgPool, data_table: &str, status_table: &str) -> Self {
        Self {
            pool,
            candidates_sql: candidates_sql(data_table),
            set_status_sql: set_status_sql(status_table),
        }
    }

    /// Round-trip a trivial query to check connectivity
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl MetricsStore for Database {
    fn stale_candidates(
        &self,
        max_values_count: u32,
        missing_days: u32,
    ) -> BoxStream<'_, Result<CandidateMetric>> {
        let missing_days = match i32::try_from(missing_days) {
            Ok(days) => days,
            Err(_) => {
                let err = AppError::ConfigError(format!(
                    "missing_days {} exceeds the database int range",
                    missing_days
                ));
                return stream::once(async move { Err::<CandidateMetric, _>(err) }).boxed();
            }
        };

        sqlx::query(&self.candidates_sql)
            .bind(i64::from(max_values_count))
            .bind(missing_days)
            .fetch(&self.pool)
            .map(|row| row.map_err(AppError::from).and_then(|row| candidate_from_row(&row)))
            .boxed()
    }
}

#[async_trait]
impl MetricStatusIndex for Database {
    async fn set_status(&self, paths: &[String], status: MetricStatus) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let result = sqlx::query(&self.set_status_sql)
            .bind(paths)
            .bind(status.as_str())
            .bind(protected_statuses(status))
            .execute(&self.pool)
            .await?;

        debug!(
            requested = paths.len(),
            updated = result.rows_affected(),
            status = %status,
            "Metric status batch applied"
        );
        Ok(())
    }
}

/// Statuses that a write of `status` must leave untouched
fn protected_statuses(status: MetricStatus) -> Vec<&'static str> {
    if status.is_handmade() {
        return Vec::new();
    }
    ALL_STATUSES
        .iter()
        .filter(|s| s.is_handmade())
        .map(MetricStatus::as_str)
        .collect()
}

fn candidate_from_row(row: &PgRow) -> Result<CandidateMetric> {
    Ok(CandidateMetric {
        path: row.try_get("path")?,
        count: row.try_get("cnt")?,
        last_timestamp: row.try_get("ts")?,
    })
}

/// Aggregate points per path and keep the sparse, stale ones.
///
/// The cutoff is computed from the database's own `current_date`, so the job and
/// the store agree on what "today" means even if their clocks differ.
fn candidates_sql(data_table: &str) -> String {
    format!(
        r#"
        SELECT path, count(*) AS cnt, max(timestamp) AS ts
        FROM {}
        GROUP BY path
        HAVING count(*) < $1
           AND max(timestamp) < extract(epoch FROM (current_date - $2::int)::timestamptz)::bigint
        "#,
        data_table
    )
}

fn set_status_sql(status_table: &str) -> String {
    format!(
        r#"
        INSERT INTO {table} (path, status, updated_at)
        SELECT DISTINCT p, $2, NOW() FROM UNNEST($1::text[]) AS u(p)
        ON CONFLICT (path) DO UPDATE
        SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
        WHERE {table}.status <> ALL($3::text[])
        "#,
        table = status_table
    )
}

/// Table names are formatted into SQL, so only plain (optionally schema-qualified)
/// identifiers are accepted.
pub fn validate_identifier(name: &str) -> Result<()> {
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|p| valid_part(p)) {
        return Err(AppError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

//! Application state shared across ops handlers

use crate::config::AutohideConfig;
use crate::db::Database;
use crate::routes::metrics::Metrics;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: Arc<Database>,
    /// Effective autohide settings, for display
    pub autohide: AutohideConfig,
    /// Autohide run counters for Prometheus
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Create new application state
    ///
    /// # Arguments
    /// * `db` - Database connection
    /// * `autohide` - Autohide settings the scheduler was started with
    /// * `metrics` - Counters shared with the scheduler
    pub fn new(db: Arc<Database>, autohide: AutohideConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            db,
            autohide,
            metrics,
        }
    }
}

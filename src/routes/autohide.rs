//! Autohide status endpoint

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /api/v1/autohide
///
/// Effective settings and the outcome of the most recent run
pub async fn get_autohide_status(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.metrics.get_metrics();

    Json(json!({
        "config": state.autohide,
        "runs_total": snapshot.runs_total,
        "runs_failed_total": snapshot.runs_failed_total,
        "metrics_hidden_total": snapshot.metrics_hidden_total,
        "last_run": snapshot.last_run,
    }))
}

//! Health and readiness endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub database: CheckStatus,
    pub autohide: CheckStatus,
}

#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub healthy: bool,
    pub message: String,
}

/// GET /health
///
/// Basic health check - returns 200 if the server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /ready
///
/// Readiness check - verifies the database is reachable
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let db_check = match state.db.ping().await {
        Ok(()) => CheckStatus {
            healthy: true,
            message: "Connected".to_string(),
        },
        Err(e) => CheckStatus {
            healthy: false,
            message: format!("Connection failed: {}", e),
        },
    };

    // A failing run is reported, but does not make the service unready
    let autohide_check = CheckStatus {
        healthy: true,
        message: autohide_message(&state),
    };

    let status_code = if db_check.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let status = if db_check.healthy { "ready" } else { "not_ready" };

    (
        status_code,
        Json(ReadinessResponse {
            status,
            checks: ReadinessChecks {
                database: db_check,
                autohide: autohide_check,
            },
        }),
    )
}

fn autohide_message(state: &AppState) -> String {
    if !state.autohide.enabled {
        return "Disabled".to_string();
    }
    match state.metrics.last_run() {
        None => "Scheduled, no run yet".to_string(),
        Some(run) if run.succeeded => format!("Last run hid {} metrics", run.hidden),
        Some(run) => format!(
            "Last run failed: {}",
            run.error.unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}

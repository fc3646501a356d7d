//! metric-autohide - hides stale, sparse metrics from the status index

use anyhow::Context;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metric_autohide::config::AppConfig;
use metric_autohide::db::Database;
use metric_autohide::routes::{autohide, health, metrics};
use metric_autohide::routes::metrics::Metrics;
use metric_autohide::state::AppState;
use metric_autohide::tasks::autohide::AutohideJob;
use metric_autohide::tasks::scheduler::AutohideScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let db = Arc::new(
        Database::new(&config.database_url, &config.data_table, &config.status_table)
            .await
            .context("Failed to connect to database")?,
    );

    let run_metrics = Arc::new(Metrics::new());
    let job = AutohideJob::new(config.autohide.clone(), db.clone(), db.clone());
    let scheduler = AutohideScheduler::start(job, run_metrics.clone());

    let state = AppState::new(db, config.autohide.clone(), run_metrics);

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/api/v1/autohide", get(autohide::get_autohide_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    info!(
        "metric-autohide v{} starting on {}",
        env!("CARGO_PKG_VERSION"),
        config.listen_addr
    );
    info!(
        "Database: {}",
        config.database_url.split('@').last().unwrap_or("***")
    );
    info!(
        data_table = %config.data_table,
        status_table = %config.status_table,
        enabled = config.autohide.enabled,
        max_values_count = config.autohide.max_values_count,
        missing_days = config.autohide.missing_days,
        "Autohide configuration"
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down");
    scheduler.stop(config.shutdown_grace).await;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "metric_autohide=info,tower_http=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal_or_pending(tokio::signal::ctrl_c().await, "Ctrl+C").await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => signal_or_pending(Err(e), "SIGTERM").await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Resolve when a signal arrived; never resolve when its handler could not be installed.
async fn signal_or_pending(received: std::io::Result<()>, name: &str) {
    if let Err(e) = received {
        warn!(error = %e, signal = name, "Failed to install signal handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_handler_failure_does_not_trigger_shutdown() {
        let failed = Err(std::io::Error::other("no signal support"));
        let waited = tokio::time::timeout(
            Duration::from_secs(3600),
            signal_or_pending(failed, "Ctrl+C"),
        )
        .await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_received_signal_resolves() {
        signal_or_pending(Ok(()), "Ctrl+C").await;
    }
}

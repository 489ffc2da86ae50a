// src/metrics/exporters.rs

use crate::error::{AppError, Result};
use axum::{http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Installs the Prometheus recorder as the global `metrics` recorder.
/// Calling it again returns the handle installed first.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PROMETHEUS
        .get_or_try_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| AppError::internal(format!("Failed to install metrics recorder: {e}")))?;
            info!("Prometheus metrics recorder installed");
            Ok(handle)
        })
        .cloned()
}

/// Renders the Prometheus text exposition, or 404 when no recorder is installed.
pub async fn metrics_handler() -> impl IntoResponse {
    debug!("Metrics handler called");
    match PROMETHEUS.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed\n".to_string()),
    }
}

// src/handlers/probes.rs

use crate::health::{HealthManager, Report, Status};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const LIVE_PATH: &str = "/health/live";
pub const READY_PATH: &str = "/health/ready";
pub const STARTUP_PATH: &str = "/health/startup";
pub const FULL_PATH: &str = "/health";

/// Body of the liveness probe.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LivenessResponse {
    pub status: Status,
}

/// Liveness, readiness, startup and full-report routes over one manager.
pub fn health_routes(manager: Arc<HealthManager>) -> Router {
    Router::new()
        .route(LIVE_PATH, get(liveness))
        .route(READY_PATH, get(readiness))
        .route(STARTUP_PATH, get(startup))
        .route(FULL_PATH, get(full_report))
        .with_state(manager)
}

fn probe_response(code: StatusCode, body: impl Serialize) -> Response {
    (code, [(header::CACHE_CONTROL, "no-store")], Json(body)).into_response()
}

fn readiness_code(report: &Report) -> StatusCode {
    if report.status.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// 200 whenever the process can answer; dependency health is ignored.
pub async fn liveness(State(manager): State<Arc<HealthManager>>) -> Response {
    if manager.is_live() {
        probe_response(StatusCode::OK, LivenessResponse { status: Status::Healthy })
    } else {
        probe_response(
            StatusCode::SERVICE_UNAVAILABLE,
            LivenessResponse { status: Status::Unhealthy },
        )
    }
}

/// 200 for healthy or degraded, 503 for unhealthy.
pub async fn readiness(State(manager): State<Arc<HealthManager>>) -> Response {
    let report = manager.evaluate().await;
    debug!(status = %report.status, "Readiness probe");
    probe_response(readiness_code(&report), report)
}

/// 200 once an evaluation is healthy; degraded still counts as not started.
pub async fn startup(State(manager): State<Arc<HealthManager>>) -> Response {
    let (started, report) = manager.startup_status().await;
    debug!(started, status = %report.status, "Startup probe");
    let code = if started {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    probe_response(code, report)
}

/// The full per-component report, with the readiness status code.
pub async fn full_report(State(manager): State<Arc<HealthManager>>) -> Response {
    let report = manager.evaluate().await;
    probe_response(readiness_code(&report), report)
}

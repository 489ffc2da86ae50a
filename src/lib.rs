// src/lib.rs

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod state;

use axum::{
    body::Body,
    http::{HeaderValue, Request as AxumRequest},
    response::IntoResponse,
    Router,
};
use std::{path::PathBuf, time::Duration, time::Instant};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use health::{
    CheckContext, CheckResult, Checker, HealthError, HealthManager, ManagerConfig, Report, Status,
};
pub use state::AppState;

/// Default configuration file, overridden by `--config` or `CONFIG_PATH`.
pub const DEFAULT_CONFIG_PATH: &str = "healthd.yaml";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the probe router for the given state.
pub fn create_router(state: &AppState) -> Router {
    let router = handlers::health_routes(state.manager.clone());

    #[cfg(feature = "metrics")]
    let router = router
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .layer(axum::middleware::from_fn(metrics::metrics_middleware));

    router.layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(trace_requests))
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
    )
}

/// Adds a request id and a tracing span around every request.
async fn trace_requests(
    mut req: AxumRequest<Body>,
    next: axum::middleware::Next,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4();
    let start_time = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        http.method = %method,
        url.path = %path,
    );

    req.extensions_mut().insert(request_id);

    async move {
        let mut response = next.run(req).await;
        let elapsed = start_time.elapsed();

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert("X-Request-ID", value);
        }

        info!(
            http.response.duration = ?elapsed,
            http.status_code = response.status().as_u16(),
            "Finished processing request"
        );

        response
    }
    .instrument(span)
    .await
}

/// Loads configuration, builds the state, starts background checks and returns the router.
pub async fn run(config_path_override: Option<PathBuf>) -> Result<(Router, AppState)> {
    info!("Starting healthd...");

    let app_config = setup_configuration(config_path_override)?;

    let state = AppState::new(&app_config).map_err(|e| {
        error!(error = ?e, "Failed to initialize application state. Exiting.");
        e
    })?;

    state.manager.start(state.shutdown.child_token())?;

    let app = create_router(&state);
    Ok((app, state))
}

/// Resolves the config path, then loads and validates it.
pub fn setup_configuration(config_path_override: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = config_path_override.unwrap_or_else(|| {
        std::env::var("CONFIG_PATH").map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
    });

    let config_path_display = config_path.display().to_string();
    if config_path.exists() {
        info!(config.path = %config_path_display, "Using configuration file");
    } else {
        info!(config.path = %config_path_display, "Optional configuration file not found. Using defaults and environment variables.");
    }

    let app_config = config::load_config(&config_path).map_err(|e| {
        error!(
            config.path = %config_path_display,
            error = ?e,
            "Failed to load or validate configuration."
        );
        e
    })?;

    let check_names: Vec<&str> = app_config.checks.iter().map(|c| c.name.as_str()).collect();
    info!(
        config.checks.count = app_config.checks.len(),
        config.checks.names = ?check_names,
        server.port = app_config.server.port,
        "Configuration loaded and validated successfully."
    );

    Ok(app_config)
}

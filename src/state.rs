// src/state.rs

use crate::config::{AppConfig, CheckConfig, CheckKind};
use crate::error::{AppError, Result};
use crate::health::{Checker, HealthManager, HttpChecker};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared application state: the configured manager and its lifecycle token.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub manager: Arc<HealthManager>,
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Builds the manager and registers one checker per configured check.
    pub fn new(config: &AppConfig) -> Result<Self> {
        info!(checks = config.checks.len(), "Creating shared AppState");

        let manager = Arc::new(HealthManager::new(config.health.to_manager_config()));
        let client = build_http_client()?;

        for check in &config.checks {
            manager.register(build_checker(check, &client)?);
            info!(
                check.name = %check.name,
                check.kind = ?check.kind,
                check.required = check.required,
                "Registered health check"
            );
        }

        Ok(Self {
            config: config.clone(),
            manager,
            shutdown: CancellationToken::new(),
        })
    }
}

fn build_http_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .user_agent(concat!("healthd/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(AppError::from)
}

/// Turns one configured check into a checker.
pub fn build_checker(check: &CheckConfig, client: &Client) -> Result<Arc<dyn Checker>> {
    let timeout = check.timeout_ms.map(Duration::from_millis);

    match check.kind {
        CheckKind::Http => {
            let expected = StatusCode::from_u16(check.expected_status).map_err(|e| {
                AppError::config_validation(
                    format!("Invalid expected status for check '{}': {e}", check.name),
                    Some("checks.expected_status"),
                )
            })?;

            let mut checker = HttpChecker::new(&check.name, &check.url, client.clone(), check.required)
                .with_expected_status(expected);
            if let Some(timeout) = timeout {
                checker = checker.with_timeout(timeout);
            }
            Ok(Arc::new(checker))
        }
        CheckKind::Redis => build_redis_checker(check, timeout),
    }
}

#[cfg(feature = "redis")]
fn build_redis_checker(check: &CheckConfig, timeout: Option<Duration>) -> Result<Arc<dyn Checker>> {
    use crate::health::RedisChecker;
    use deadpool_redis::{Config, Runtime};

    let pool = Config::from_url(&check.url)
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| AppError::config_validation(
            format!("Failed to create Redis pool for check '{}': {e}", check.name),
            Some("checks.url"),
        ))?;

    let mut checker = RedisChecker::new(&check.name, pool, check.required);
    if let Some(timeout) = timeout {
        checker = checker.with_timeout(timeout);
    }
    Ok(Arc::new(checker))
}

#[cfg(not(feature = "redis"))]
fn build_redis_checker(check: &CheckConfig, _timeout: Option<Duration>) -> Result<Arc<dyn Checker>> {
    Err(AppError::config_validation(
        format!(
            "Check '{}' uses redis, but this build was compiled without the `redis` feature",
            check.name
        ),
        Some("checks.kind"),
    ))
}

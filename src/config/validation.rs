// src/config/validation.rs

use crate::config::{AppConfig, CheckConfig, CheckKind};
use crate::error::{AppError, Result};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AppConfig) -> Result<()> {
        debug!("Starting configuration validation");

        if let Err(e) = Self::validate_server_config(config) {
            warn!("Server config validation failed: {}", e);
            return Err(e);
        }

        if let Err(e) = Self::validate_health_settings(config) {
            warn!("Health settings validation failed: {}", e);
            return Err(e);
        }

        if let Err(e) = Self::validate_checks(config) {
            warn!("Check validation failed: {}", e);
            return Err(e);
        }

        debug!("Configuration validation completed successfully");
        Ok(())
    }

    fn validate_server_config(config: &AppConfig) -> Result<()> {
        if config.server.host.trim().is_empty() {
            return Err(AppError::config_validation(
                "Server host cannot be empty",
                Some("server.host"),
            ));
        }
        Ok(())
    }

    fn validate_health_settings(config: &AppConfig) -> Result<()> {
        let health = &config.health;

        if health.timeout_ms == 0 {
            return Err(AppError::config_validation(
                "Check timeout cannot be 0",
                Some("health.timeout_ms"),
            ));
        }

        if health.background_interval_ms == 0 {
            return Err(AppError::config_validation(
                "Background interval cannot be 0",
                Some("health.background_interval_ms"),
            ));
        }

        if health.failure_threshold == 0 {
            return Err(AppError::config_validation(
                "Failure threshold must be at least 1",
                Some("health.failure_threshold"),
            ));
        }

        // cache_ttl_ms == 0 is valid: every evaluation runs the checks.
        Ok(())
    }

    fn validate_checks(config: &AppConfig) -> Result<()> {
        if config.checks.is_empty() {
            warn!("No checks configured; the service will always report healthy");
        }

        let mut names = HashSet::new();
        for check in &config.checks {
            if check.name.trim().is_empty() {
                return Err(AppError::config_validation(
                    "Check name cannot be empty",
                    Some("checks.name"),
                ));
            }

            if !names.insert(check.name.as_str()) {
                return Err(AppError::config_validation(
                    format!("Duplicate check name: {}", check.name),
                    Some("checks.name"),
                ));
            }

            if check.timeout_ms == Some(0) {
                return Err(AppError::config_validation(
                    format!("Timeout for check '{}' cannot be 0", check.name),
                    Some("checks.timeout_ms"),
                ));
            }

            Self::validate_check_target(check)?;
        }

        debug!("Validated {} checks", config.checks.len());
        Ok(())
    }

    fn validate_check_target(check: &CheckConfig) -> Result<()> {
        let url = Url::parse(&check.url).map_err(|e| {
            AppError::config_validation(
                format!("Invalid URL for check '{}': {} - {}", check.name, check.url, e),
                Some("checks.url"),
            )
        })?;

        let allowed: &[&str] = match check.kind {
            CheckKind::Http => &["http", "https"],
            CheckKind::Redis => &["redis", "rediss"],
        };
        if !allowed.contains(&url.scheme()) {
            return Err(AppError::config_validation(
                format!(
                    "Unsupported scheme '{}' for check '{}'. Supported: {}",
                    url.scheme(),
                    check.name,
                    allowed.join(", ")
                ),
                Some("checks.url"),
            ));
        }

        if check.kind == CheckKind::Http && !(100..=599).contains(&check.expected_status) {
            return Err(AppError::config_validation(
                format!(
                    "Expected status {} for check '{}' is not a valid HTTP status",
                    check.expected_status, check.name
                ),
                Some("checks.expected_status"),
            ));
        }

        if check.kind == CheckKind::Redis && !cfg!(feature = "redis") {
            return Err(AppError::config_validation(
                format!(
                    "Check '{}' uses redis, but this build was compiled without the `redis` feature",
                    check.name
                ),
                Some("checks.kind"),
            ));
        }

        Ok(())
    }
}

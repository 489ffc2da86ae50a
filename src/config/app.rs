// src/config/app.rs

use crate::health::ManagerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Manager tuning as it appears in the configuration file.
#[derive(Debug, Deserialize, Clone, PartialEq, Serialize)]
pub struct HealthSettings {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default = "default_background_interval_ms")]
    pub background_interval_ms: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default)]
    pub startup_latch: bool,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            background_interval_ms: default_background_interval_ms(),
            failure_threshold: default_failure_threshold(),
            startup_latch: false,
        }
    }
}

impl HealthSettings {
    pub fn to_manager_config(&self) -> ManagerConfig {
        ManagerConfig::default()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_cache_ttl(Duration::from_millis(self.cache_ttl_ms))
            .with_background_interval(Duration::from_millis(self.background_interval_ms))
            .with_failure_threshold(self.failure_threshold)
            .with_startup_latch(self.startup_latch)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    #[default]
    Http,
    Redis,
}

/// One dependency probe declared in the configuration file.
#[derive(Debug, Deserialize, Clone, PartialEq, Serialize)]
pub struct CheckConfig {
    pub name: String,
    #[serde(default)]
    pub kind: CheckKind,
    pub url: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    /// Per-check override of `health.timeout_ms`.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub health: HealthSettings,
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_cache_ttl_ms() -> u64 {
    30_000
}

fn default_background_interval_ms() -> u64 {
    30_000
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_required() -> bool {
    true
}

fn default_expected_status() -> u16 {
    200
}

impl AppConfig {
    /// Example configuration written by `healthd generate-config`.
    /// The Redis example is only included when the `redis` feature is built in.
    pub fn template() -> Self {
        let mut checks = vec![CheckConfig {
            name: "payments-api".to_string(),
            kind: CheckKind::Http,
            url: "http://payments.internal:8080/health".to_string(),
            required: true,
            expected_status: 200,
            timeout_ms: Some(2_000),
        }];

        if cfg!(feature = "redis") {
            checks.push(CheckConfig {
                name: "cache".to_string(),
                kind: CheckKind::Redis,
                url: "redis://127.0.0.1:6379".to_string(),
                required: false,
                expected_status: default_expected_status(),
                timeout_ms: None,
            });
        }

        Self {
            server: ServerConfig::default(),
            health: HealthSettings::default(),
            checks,
        }
    }
}

// src/config/mod.rs

pub mod app;
pub mod loader;
pub mod validation;

pub use app::{AppConfig, CheckConfig, CheckKind, HealthSettings, ServerConfig};
pub use loader::{load_config, save_config, ENV_PREFIX};
pub use validation::ConfigValidator;

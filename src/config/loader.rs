// src/config/loader.rs

use crate::config::{AppConfig, ConfigValidator};
use crate::error::{AppError, Result};
use ::config::{Config, Environment, File, FileFormat};
use std::path::Path;
use tracing::{debug, info};

/// Prefix of environment overrides, e.g. `HEALTHD__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "HEALTHD";

/// Load configuration from defaults, an optional YAML file and the environment
pub fn load_config(config_path: &Path) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if config_path.exists() {
        info!("Loading configuration from file: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).format(FileFormat::Yaml));
    } else {
        info!("Configuration file not found, using defaults");
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config: AppConfig = builder.build()?.try_deserialize()?;

    ConfigValidator::validate(&config)?;

    debug!(
        checks = config.checks.len(),
        "Configuration loaded and validated successfully"
    );
    Ok(config)
}

/// Save configuration to file as YAML
pub async fn save_config(config: &AppConfig, config_path: &Path) -> Result<()> {
    let yaml_content = serde_yaml::to_string(config)
        .map_err(|e| AppError::Serialization { message: format!("Failed to serialize config: {}", e) })?;

    tokio::fs::write(config_path, yaml_content)
        .await
        .map_err(|e| AppError::Io { operation: "write_config".to_string(), message: format!("Failed to write config file: {}", e) })?;

    info!("Configuration saved to: {}", config_path.display());
    Ok(())
}

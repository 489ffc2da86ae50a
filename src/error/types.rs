//! Conversions from library errors into [`AppError`]

use super::AppError;

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            operation: "io_operation".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        Self::HttpClient {
            message: err.to_string(),
            status_code,
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        Self::config_validation(format!("Invalid URL: {err}"), None::<String>)
    }
}

impl From<::config::ConfigError> for AppError {
    fn from(err: ::config::ConfigError) -> Self {
        match err {
            ::config::ConfigError::NotFound(path) => Self::ConfigNotFound { path },
            ::config::ConfigError::Type { .. } => {
                Self::config_validation(err.to_string(), None::<String>)
            }
            _ => Self::ConfigParse {
                message: err.to_string(),
                line: None,
            },
        }
    }
}

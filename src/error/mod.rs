//! Error handling module
//!
//! Check failures never surface here: they are `CheckResult` values. This
//! module covers the application layer around the health core:
//! - configuration loading and validation
//! - scheduler lifecycle misuse
//! - I/O and serialization in the CLI
//! - RFC 7807 Problem Details responses for the HTTP surface

pub mod types;

use crate::health::HealthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Standard error response format following RFC 7807 Problem Details
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type")]
    pub error_type: String,

    /// A short, human-readable summary of the problem type
    pub title: String,

    /// The HTTP status code
    pub status: u16,

    /// A human-readable explanation specific to this occurrence
    pub detail: String,

    /// A URI reference that identifies the specific occurrence
    pub instance: String,

    /// Request ID for tracing
    pub request_id: Option<String>,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String, line: Option<usize> },

    // HTTP and network errors
    #[error("HTTP client error: {message}")]
    HttpClient { message: String, status_code: Option<u16> },

    // Health manager lifecycle
    #[error("Health manager error: {0}")]
    Health(#[from] HealthError),

    // System errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("IO operation failed: {operation} - {message}")]
    Io { operation: String, message: String },
}

impl AppError {
    /// Create a new configuration validation error
    pub fn config_validation(message: impl Into<String>, field: Option<impl Into<String>>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
            field: field.map(Into::into),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ConfigParse { .. } | Self::Serialization { .. } => StatusCode::BAD_REQUEST,

            Self::ConfigNotFound { .. } => StatusCode::NOT_FOUND,

            Self::Health(HealthError::SchedulerAlreadyRunning) => StatusCode::CONFLICT,

            Self::ConfigValidation { .. }
            | Self::Internal { .. }
            | Self::Io { .. }
            | Self::Health(HealthError::ZeroInterval) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            Self::HttpClient { .. } => StatusCode::BAD_GATEWAY,

            Self::Health(HealthError::SchedulerNotRunning) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error type URI for RFC 7807 compliance
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::ConfigValidation { .. } | Self::ConfigNotFound { .. } | Self::ConfigParse { .. } => {
                "https://healthd.dev/errors/configuration"
            }
            Self::HttpClient { .. } => "https://healthd.dev/errors/network",
            Self::Health(_) => "https://healthd.dev/errors/scheduler",
            _ => "https://healthd.dev/errors/internal",
        }
    }

    /// Get a human-readable title for the error
    pub fn title(&self) -> &'static str {
        match self {
            Self::ConfigValidation { .. } | Self::ConfigNotFound { .. } | Self::ConfigParse { .. } => {
                "Configuration Error"
            }
            Self::HttpClient { .. } => "Network Error",
            Self::Health(_) => "Scheduler Error",
            _ => "Internal Server Error",
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self, request_id: Option<&str>) {
        let request_id = request_id.unwrap_or("unknown");

        if self.status_code().is_server_error() {
            error!(
                error = %self,
                request_id = request_id,
                error_type = self.error_type(),
                "Application error occurred"
            );
        } else {
            warn!(
                error = %self,
                request_id = request_id,
                error_type = self.error_type(),
                "Client error occurred"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();

        self.log(Some(&request_id));

        let status = self.status_code();
        let error_response = ErrorResponse {
            error_type: self.error_type().to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: self.to_string(),
            instance: format!("/errors/{}", request_id),
            request_id: Some(request_id),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::config_validation("bad", Some("health.timeout_ms")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::ConfigNotFound { path: "x.yaml".into() }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(HealthError::SchedulerAlreadyRunning).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(HealthError::ZeroInterval).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_health_error_display() {
        let err = AppError::from(HealthError::SchedulerNotRunning);
        assert_eq!(
            err.to_string(),
            "Health manager error: background health checks are not running"
        );
        assert_eq!(err.title(), "Scheduler Error");
    }

    #[tokio::test]
    async fn test_into_response_problem_details() {
        let response = AppError::internal("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let problem: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(problem.status, 500);
        assert_eq!(problem.title, "Internal Server Error");
        assert!(problem.instance.starts_with("/errors/"));
    }
}

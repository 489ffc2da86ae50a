// src/health/status.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health status of a single component or of the whole service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The component is functioning normally.
    Healthy,
    /// The component is not functioning.
    Unhealthy,
    /// The component is functioning, but with issues.
    Degraded,
}

impl Status {
    pub fn is_healthy(self) -> bool {
        self == Status::Healthy
    }

    /// Whether traffic may still be served in this state.
    pub fn is_serving(self) -> bool {
        matches!(self, Status::Healthy | Status::Degraded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Healthy => "healthy",
            Status::Unhealthy => "unhealthy",
            Status::Degraded => "degraded",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

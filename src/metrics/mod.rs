//! Metrics recording for health evaluation cycles.
//!
//! Uses the `metrics` facade; nothing is exported unless a recorder has been
//! installed (see [`exporters::install_recorder`]).

pub mod exporters;
pub mod middleware;

pub use exporters::{install_recorder, metrics_handler};
pub use middleware::metrics_middleware;

use crate::health::{Report, Status};
use metrics::{counter, gauge, histogram};

pub const CHECK_DURATION_SECONDS: &str = "healthd_check_duration_seconds";
pub const CHECK_STATUS: &str = "healthd_check_status";
pub const CHECK_CONSECUTIVE_FAILURES: &str = "healthd_check_consecutive_failures";
pub const EVALUATIONS_TOTAL: &str = "healthd_evaluations_total";
pub const OVERALL_STATUS: &str = "healthd_overall_status";

/// Gauge value for a status: 1 healthy, 0.5 degraded, 0 unhealthy.
pub fn status_value(status: Status) -> f64 {
    match status {
        Status::Healthy => 1.0,
        Status::Degraded => 0.5,
        Status::Unhealthy => 0.0,
    }
}

/// Record one evaluation cycle: per-component duration, status and failure streak.
pub fn record_report(report: &Report, failure_counts: &[(String, u32)]) {
    counter!(EVALUATIONS_TOTAL).increment(1);
    gauge!(OVERALL_STATUS).set(status_value(report.status));

    for (name, result) in &report.checks {
        histogram!(CHECK_DURATION_SECONDS, "component" => name.clone())
            .record(result.duration_ms as f64 / 1000.0);
        gauge!(CHECK_STATUS, "component" => name.clone()).set(status_value(result.status));
    }

    for (name, count) in failure_counts {
        gauge!(CHECK_CONSECUTIVE_FAILURES, "component" => name.clone()).set(*count as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_value_ordering() {
        assert!(status_value(Status::Healthy) > status_value(Status::Degraded));
        assert!(status_value(Status::Degraded) > status_value(Status::Unhealthy));
    }
}

// src/health/result.rs

use super::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::time::Duration;

/// Outcome of one checker invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: Status,
    /// Elapsed time of the check in whole milliseconds.
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl CheckResult {
    fn new(status: Status, duration: Duration, error: Option<String>) -> Self {
        Self {
            status,
            duration_ms: duration.as_millis() as u64,
            error,
            details: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn healthy(duration: Duration) -> Self {
        Self::new(Status::Healthy, duration, None)
    }

    pub fn unhealthy(duration: Duration, error: impl Display) -> Self {
        Self::new(Status::Unhealthy, duration, Some(error.to_string()))
    }

    pub fn degraded(duration: Duration, message: impl Into<String>) -> Self {
        Self::new(Status::Degraded, duration, Some(message.into()))
    }

    /// Result recorded for a check that did not finish before its deadline.
    pub fn timed_out(timeout: Duration) -> Self {
        Self::unhealthy(
            timeout,
            format!("check timed out after {}ms", timeout.as_millis()),
        )
    }

    pub fn with_details(mut self, details: BTreeMap<String, serde_json::Value>) -> Self {
        self.details = details;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Aggregate outcome of every registered checker at one evaluation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub status: Status,
    pub checks: BTreeMap<String, CheckResult>,
    pub timestamp: DateTime<Utc>,
}

impl Report {
    /// Builds a report, collapsing `checks` into one status with [`aggregate`].
    pub fn new(checks: BTreeMap<String, CheckResult>, required: &HashMap<String, bool>) -> Self {
        Self {
            status: aggregate(&checks, required),
            checks,
            timestamp: Utc::now(),
        }
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.get(name)
    }
}

/// Collapses individual results into one overall status.
///
/// A required component that is unhealthy makes the service unhealthy. An
/// unhealthy optional component, or any degraded component, makes it degraded.
/// Names without a requiredness entry count as optional.
pub fn aggregate(checks: &BTreeMap<String, CheckResult>, required: &HashMap<String, bool>) -> Status {
    let mut status = Status::Healthy;

    for (name, result) in checks {
        match result.status {
            Status::Unhealthy if required.get(name).copied().unwrap_or(false) => {
                return Status::Unhealthy;
            }
            Status::Unhealthy | Status::Degraded => status = Status::Degraded,
            Status::Healthy => {}
        }
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn result(status: Status) -> CheckResult {
        match status {
            Status::Healthy => CheckResult::healthy(Duration::from_millis(1)),
            Status::Unhealthy => CheckResult::unhealthy(Duration::from_millis(1), "down"),
            Status::Degraded => CheckResult::degraded(Duration::from_millis(1), "slow"),
        }
    }

    fn build(entries: &[(&str, Status, bool)]) -> (BTreeMap<String, CheckResult>, HashMap<String, bool>) {
        let mut checks = BTreeMap::new();
        let mut required = HashMap::new();
        for (name, status, req) in entries {
            checks.insert(name.to_string(), result(*status));
            required.insert(name.to_string(), *req);
        }
        (checks, required)
    }

    #[rstest]
    #[case::empty(&[], Status::Healthy)]
    #[case::all_healthy(&[("db", Status::Healthy, true), ("cache", Status::Healthy, false)], Status::Healthy)]
    #[case::required_unhealthy(&[("db", Status::Unhealthy, true), ("cache", Status::Healthy, false)], Status::Unhealthy)]
    #[case::optional_unhealthy(&[("db", Status::Healthy, true), ("cache", Status::Unhealthy, false)], Status::Degraded)]
    #[case::required_degraded(&[("db", Status::Degraded, true)], Status::Degraded)]
    #[case::optional_degraded(&[("cache", Status::Degraded, false)], Status::Degraded)]
    #[case::required_dominates(&[("a", Status::Degraded, false), ("b", Status::Unhealthy, false), ("z", Status::Unhealthy, true)], Status::Unhealthy)]
    fn test_aggregate_table(#[case] entries: &[(&str, Status, bool)], #[case] expected: Status) {
        let (checks, required) = build(entries);
        assert_eq!(aggregate(&checks, &required), expected);
    }

    #[test]
    fn test_unknown_name_counts_as_optional() {
        let mut checks = BTreeMap::new();
        checks.insert("orphan".to_string(), result(Status::Unhealthy));
        assert_eq!(aggregate(&checks, &HashMap::new()), Status::Degraded);
    }

    #[test]
    fn test_result_constructors() {
        let ok = CheckResult::healthy(Duration::from_millis(42));
        assert_eq!(ok.status, Status::Healthy);
        assert_eq!(ok.duration_ms, 42);
        assert!(ok.error.is_none());

        let timed_out = CheckResult::timed_out(Duration::from_millis(250));
        assert_eq!(timed_out.status, Status::Unhealthy);
        assert_eq!(timed_out.error.as_deref(), Some("check timed out after 250ms"));
    }

    #[test]
    fn test_result_json_omits_empty_fields() {
        let json = serde_json::to_value(CheckResult::healthy(Duration::from_millis(3))).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["duration_ms"], 3);
        assert!(json.get("error").is_none());
        assert!(json.get("details").is_none());
        assert!(json["timestamp"].is_string());

        let json = serde_json::to_value(
            CheckResult::unhealthy(Duration::ZERO, "boom").with_detail("status_code", 500),
        )
        .unwrap();
        assert_eq!(json["error"], "boom");
        assert_eq!(json["details"]["status_code"], 500);
    }

    fn status_strategy() -> impl Strategy<Value = Status> {
        prop_oneof![Just(Status::Healthy), Just(Status::Unhealthy), Just(Status::Degraded)]
    }

    proptest! {
        #[test]
        fn prop_aggregate_matches_rule(entries in prop::collection::vec((status_strategy(), any::<bool>()), 0..12)) {
            let mut checks = BTreeMap::new();
            let mut required = HashMap::new();
            for (i, (status, req)) in entries.iter().enumerate() {
                let name = format!("check-{i}");
                checks.insert(name.clone(), result(*status));
                required.insert(name, *req);
            }

            let any_required_unhealthy = entries.iter().any(|(s, r)| *s == Status::Unhealthy && *r);
            let any_non_healthy = entries.iter().any(|(s, _)| *s != Status::Healthy);
            let expected = if any_required_unhealthy {
                Status::Unhealthy
            } else if any_non_healthy {
                Status::Degraded
            } else {
                Status::Healthy
            };

            prop_assert_eq!(aggregate(&checks, &required), expected);
        }
    }
}

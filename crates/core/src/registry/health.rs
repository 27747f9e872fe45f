//! Live health of a source.
//!
//! Only timestamps are stored; [`derive_status`] turns them into a status
//! at read time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of the last explicit source test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    Passed,
    Failed,
    #[default]
    Unknown,
}

impl TestResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// Derived health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Healthy,
    Failing,
    Unknown,
}

impl SourceStatus {
    pub const ALL: [SourceStatus; 3] = [Self::Healthy, Self::Failing, Self::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Failing => "failing",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_filter_value(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded outcomes for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthState {
    pub last_test_result: TestResult,
    pub last_test_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl HealthState {
    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.last_success_at = Some(at);
    }

    pub fn record_failure(&mut self, at: DateTime<Utc>, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.last_error_at = Some(at);
    }

    pub fn record_test(&mut self, at: DateTime<Utc>, passed: bool) {
        self.last_test_result = if passed {
            TestResult::Passed
        } else {
            TestResult::Failed
        };
        self.last_test_at = Some(at);
    }
}

/// Status of a source given its recorded outcomes.
///
/// The later of the last success and the last error is the latest live
/// invocation (success wins a tie). Within `window` of `now`, inclusive,
/// it decides healthy or failing; otherwise the status is unknown.
pub fn derive_status(now: DateTime<Utc>, health: &HealthState, window: Duration) -> SourceStatus {
    let latest = match (health.last_success_at, health.last_error_at) {
        (Some(ok), Some(err)) if err > ok => Some((err, SourceStatus::Failing)),
        (Some(ok), _) => Some((ok, SourceStatus::Healthy)),
        (None, Some(err)) => Some((err, SourceStatus::Failing)),
        (None, None) => None,
    };

    match latest {
        Some((at, status)) if now - at <= window => status,
        _ => SourceStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn window() -> Duration {
        Duration::seconds(86_400)
    }

    #[test]
    fn test_never_invoked_is_unknown() {
        assert_eq!(
            derive_status(t0(), &HealthState::default(), window()),
            SourceStatus::Unknown
        );
    }

    #[test]
    fn test_recent_success_is_healthy() {
        let mut health = HealthState::default();
        health.record_success(t0());
        let now = t0() + Duration::seconds(60);
        assert_eq!(derive_status(now, &health, window()), SourceStatus::Healthy);
    }

    #[test]
    fn test_later_error_is_failing() {
        let mut health = HealthState::default();
        health.record_success(t0());
        health.record_failure(t0() + Duration::seconds(10), "boom");
        let now = t0() + Duration::seconds(20);
        assert_eq!(derive_status(now, &health, window()), SourceStatus::Failing);

        health.record_success(t0() + Duration::seconds(15));
        assert_eq!(derive_status(now, &health, window()), SourceStatus::Healthy);
        assert_eq!(health.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_window_edge_is_inclusive() {
        let mut health = HealthState::default();
        health.record_failure(t0(), "boom");

        let edge = t0() + window();
        assert_eq!(derive_status(edge, &health, window()), SourceStatus::Failing);

        let past = edge + Duration::seconds(1);
        assert_eq!(derive_status(past, &health, window()), SourceStatus::Unknown);
    }

    #[test]
    fn test_test_result_does_not_affect_status() {
        let mut health = HealthState::default();
        health.record_test(t0(), true);
        assert_eq!(health.last_test_result, TestResult::Passed);
        assert_eq!(derive_status(t0(), &health, window()), SourceStatus::Unknown);
    }

    #[test]
    fn test_status_filter_values() {
        assert_eq!(
            SourceStatus::from_filter_value("Failing"),
            Some(SourceStatus::Failing)
        );
        assert_eq!(SourceStatus::from_filter_value("broken"), None);
    }
}

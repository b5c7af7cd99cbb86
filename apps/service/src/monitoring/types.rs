use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Live status of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    #[default]
    Unknown,
    Up,
    Down,
}

impl MonitorStatus {
    /// Parse the stored representation, anything unrecognised is `Unknown`
    pub fn parse(value: &str) -> Self {
        match value {
            "up" => MonitorStatus::Up,
            "down" => MonitorStatus::Down,
            _ => MonitorStatus::Unknown,
        }
    }

    /// True when moving from `self` to `next` flips between up and down.
    ///
    /// The first probe of a fresh monitor (`Unknown` -> anything) is not a transition.
    pub fn is_transition_to(self, next: MonitorStatus) -> bool {
        matches!(
            (self, next),
            (MonitorStatus::Up, MonitorStatus::Down) | (MonitorStatus::Down, MonitorStatus::Up)
        )
    }
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorStatus::Up => write!(f, "up"),
            MonitorStatus::Down => write!(f, "down"),
            MonitorStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome class of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PingStatus {
    Success,
    Failure,
}

impl PingStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(PingStatus::Success),
            "failure" => Some(PingStatus::Failure),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        self == PingStatus::Success
    }

    /// Monitor status implied by this outcome
    pub fn monitor_status(self) -> MonitorStatus {
        match self {
            PingStatus::Success => MonitorStatus::Up,
            PingStatus::Failure => MonitorStatus::Down,
        }
    }
}

impl std::fmt::Display for PingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PingStatus::Success => write!(f, "success"),
            PingStatus::Failure => write!(f, "failure"),
        }
    }
}

/// Classified result of one HTTP probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    pub status: PingStatus,

    /// Round trip until response headers, `None` when no response arrived
    pub response_time_ms: Option<u64>,

    pub status_code: Option<u16>,

    /// Only set on failure
    pub error_message: Option<String>,
}

impl ProbeOutcome {
    /// 2xx response
    pub fn success(response_time_ms: u64, status_code: u16) -> Self {
        Self {
            status: PingStatus::Success,
            response_time_ms: Some(response_time_ms),
            status_code: Some(status_code),
            error_message: None,
        }
    }

    /// Response arrived but was not 2xx
    pub fn http_failure(response_time_ms: u64, status_code: u16, message: String) -> Self {
        Self {
            status: PingStatus::Failure,
            response_time_ms: Some(response_time_ms),
            status_code: Some(status_code),
            error_message: Some(message),
        }
    }

    /// No response at all (timeout, DNS, connection refused, TLS...)
    pub fn transport_failure(message: String) -> Self {
        Self {
            status: PingStatus::Failure,
            response_time_ms: None,
            status_code: None,
            error_message: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// A completed check of one monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// UUID of the monitor that was checked
    pub monitor_id: Uuid,

    /// When the request was issued; becomes the ping log timestamp
    pub started_at: DateTime<Utc>,

    /// When the outcome was known; becomes `last_checked_at`
    pub completed_at: DateTime<Utc>,

    pub outcome: ProbeOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_detection() {
        assert!(MonitorStatus::Up.is_transition_to(MonitorStatus::Down));
        assert!(MonitorStatus::Down.is_transition_to(MonitorStatus::Up));

        assert!(!MonitorStatus::Up.is_transition_to(MonitorStatus::Up));
        assert!(!MonitorStatus::Down.is_transition_to(MonitorStatus::Down));
        assert!(!MonitorStatus::Unknown.is_transition_to(MonitorStatus::Down));
        assert!(!MonitorStatus::Unknown.is_transition_to(MonitorStatus::Up));
    }

    #[test]
    fn test_status_round_trips_through_storage_form() {
        for status in [MonitorStatus::Up, MonitorStatus::Down, MonitorStatus::Unknown] {
            assert_eq!(MonitorStatus::parse(&status.to_string()), status);
        }
        assert_eq!(MonitorStatus::parse("degraded"), MonitorStatus::Unknown);
        assert_eq!(PingStatus::parse("success"), Some(PingStatus::Success));
        assert_eq!(PingStatus::parse("up"), None);
    }

    #[test]
    fn test_transport_failure_has_no_timing() {
        let outcome = ProbeOutcome::transport_failure("connection refused".to_string());
        assert!(!outcome.is_success());
        assert_eq!(outcome.response_time_ms, None);
        assert_eq!(outcome.status_code, None);
    }
}

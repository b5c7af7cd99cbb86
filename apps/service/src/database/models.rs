use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::monitoring::types::{CheckResult, MonitorStatus, PingStatus};

/// Default check interval, 5 minutes
pub const DEFAULT_INTERVAL_MS: u64 = 300_000;
/// Default probe timeout, 10 seconds
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Monitor model - a registered target URL and its live aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: Uuid,
    pub name: String,
    /// Where status change alerts for this monitor go
    pub owner_contact: String,
    pub url: String,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub active: bool,
    pub status: MonitorStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub total_checks: u64,
    pub successful_checks: u64,
    pub uptime: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Monitor {
    /// Create a new active monitor with default interval and timeout
    pub fn new(name: impl Into<String>, url: impl Into<String>, owner_contact: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner_contact: owner_contact.into(),
            url: url.into(),
            interval_ms: DEFAULT_INTERVAL_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            active: true,
            status: MonitorStatus::Unknown,
            last_checked_at: None,
            total_checks: 0,
            successful_checks: 0,
            uptime: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the check interval has elapsed at `now`.
    ///
    /// Never-checked monitors are due immediately; a `last_checked_at` in the
    /// future (clock skew) is never due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_checked_at {
            None => true,
            Some(last) => {
                let elapsed = now.signed_duration_since(last).num_milliseconds();
                elapsed >= 0 && elapsed as u64 >= self.interval_ms
            }
        }
    }
}

/// New aggregate values written by the status tracker after one probe
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateUpdate {
    pub status: MonitorStatus,
    pub last_checked_at: DateTime<Utc>,
    pub total_checks: u64,
    pub successful_checks: u64,
    pub uptime: f64,
}

impl AggregateUpdate {
    /// Apply the update to a copy of the pre-probe snapshot
    pub fn applied_to(&self, snapshot: &Monitor) -> Monitor {
        Monitor {
            status: self.status,
            last_checked_at: Some(self.last_checked_at),
            total_checks: self.total_checks,
            successful_checks: self.successful_checks,
            uptime: self.uptime,
            updated_at: self.last_checked_at,
            ..snapshot.clone()
        }
    }
}

/// PingLog model - the immutable record of one probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingLog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub monitor_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub status: PingStatus,
    pub response_time: Option<u64>,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
}

impl PingLog {
    /// Build the log entry for a completed check
    pub fn from_check_result(result: &CheckResult) -> Self {
        Self {
            id: None,
            monitor_id: result.monitor_id,
            timestamp: result.started_at,
            status: result.outcome.status,
            response_time: result.outcome.response_time_ms,
            status_code: result.outcome.status_code,
            error_message: result.outcome.error_message.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Convert a timestamp to unix milliseconds for storage
pub fn timestamp_to_i64(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

/// Convert stored unix milliseconds back to a timestamp
pub fn i64_to_timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

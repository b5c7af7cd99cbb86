use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::models::PingLog;
use crate::monitoring::tracker::{round2, uptime_percent};

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Longest window a period may name
pub const MAX_PERIOD_DAYS: i64 = 3650;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Period must look like 30m, 24h or 7d, got {0:?}")]
    Malformed(String),
    #[error("Period must be longer than zero")]
    Empty,
    #[error("Period must not exceed 3650 days")]
    TooLong,
}

/// Length of a statistics window together with the label it was requested as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    label: String,
    length: TimeDelta,
}

impl Period {
    pub fn hours(hours: i64) -> Self {
        Self { label: format!("{hours}h"), length: TimeDelta::hours(hours) }
    }

    pub fn days(days: i64) -> Self {
        Self { label: format!("{days}d"), length: TimeDelta::days(days) }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn length(&self) -> TimeDelta {
        self.length
    }

    /// Window start when the window ends at `now`
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.length).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::hours(24)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let malformed = || PeriodError::Malformed(s.to_string());

        let split = s.len().checked_sub(1).filter(|&i| s.is_char_boundary(i)).ok_or_else(malformed)?;
        let (amount, unit) = s.split_at(split);
        let amount: i64 = amount.parse().map_err(|_| malformed())?;

        if amount <= 0 {
            return Err(PeriodError::Empty);
        }

        let length = match unit {
            "m" => TimeDelta::try_minutes(amount),
            "h" => TimeDelta::try_hours(amount),
            "d" => TimeDelta::try_days(amount),
            _ => return Err(malformed()),
        }
        .ok_or(PeriodError::TooLong)?;

        if length > TimeDelta::days(MAX_PERIOD_DAYS) {
            return Err(PeriodError::TooLong);
        }

        Ok(Self { label: s.to_string(), length })
    }
}

/// Headline numbers for a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeStats {
    pub uptime: f64,
    pub total_pings: u64,
    pub successful_pings: u64,
    pub avg_response_time: u64,
    pub period: String,
}

/// One calendar hour of the uptime chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeBucket {
    pub timestamp: DateTime<Utc>,
    pub uptime: f64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub stats: UptimeStats,
    pub chart_data: Vec<UptimeBucket>,
}

/// Compute the stats of `logs`, which are all the entries of one window.
/// Pure: no I/O, the output depends on the arguments only.
pub fn compute_stats(logs: &[PingLog], period: &Period) -> StatsReport {
    let total_pings = logs.len() as u64;
    let successful_pings = logs.iter().filter(|log| log.is_success()).count() as u64;

    let (sum, timed) = logs
        .iter()
        .filter_map(|log| log.response_time)
        .fold((0u64, 0u64), |(sum, n), rt| (sum + rt, n + 1));
    let avg_response_time = if timed == 0 { 0 } else { (sum as f64 / timed as f64).round() as u64 };

    StatsReport {
        stats: UptimeStats {
            uptime: uptime_percent(successful_pings, total_pings),
            total_pings,
            successful_pings,
            avg_response_time,
            period: period.label().to_string(),
        },
        chart_data: hourly_buckets(logs),
    }
}

/// Group entries by the UTC hour they happened in, oldest hour first
pub fn hourly_buckets(logs: &[PingLog]) -> Vec<UptimeBucket> {
    let mut hours: BTreeMap<i64, (u64, u64)> = BTreeMap::new();

    for log in logs {
        let hour = log.timestamp.timestamp_millis().div_euclid(MILLIS_PER_HOUR) * MILLIS_PER_HOUR;
        let entry = hours.entry(hour).or_default();
        entry.0 += 1;
        if log.is_success() {
            entry.1 += 1;
        }
    }

    hours
        .into_iter()
        .map(|(hour, (total, successful))| UptimeBucket {
            timestamp: DateTime::from_timestamp_millis(hour).unwrap_or_default(),
            uptime: round2(successful as f64 * 100.0 / total as f64),
            total,
        })
        .collect()
}

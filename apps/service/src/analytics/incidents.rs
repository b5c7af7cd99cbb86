use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::PingLog;

/// How many incidents a summary shows by default
pub const DEFAULT_INCIDENT_LIMIT: usize = 10;

/// A maximal run of failed probes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub start_time: DateTime<Utc>,
    /// For an ongoing incident this is the time of the scan
    pub end_time: DateTime<Utc>,
    /// Milliseconds
    pub duration: i64,
    pub ongoing: bool,
}

impl Incident {
    fn closed(start_time: DateTime<Utc>, end_time: DateTime<Utc>, ongoing: bool) -> Self {
        let end_time = end_time.max(start_time);
        Self {
            start_time,
            end_time,
            duration: end_time.signed_duration_since(start_time).num_milliseconds(),
            ongoing,
        }
    }
}

/// Derive incidents from logs sorted oldest first.
///
/// A failure opens an incident, the next success closes it; an incident
/// still open at the end is closed at `now` and marked ongoing. Only the
/// `limit` most recent incidents are returned, oldest first.
pub fn detect_incidents(logs: &[PingLog], now: DateTime<Utc>, limit: usize) -> Vec<Incident> {
    let mut incidents = Vec::new();
    let mut open: Option<DateTime<Utc>> = None;

    for log in logs {
        match (open, log.is_success()) {
            (None, false) => open = Some(log.timestamp),
            (Some(start), true) => {
                incidents.push(Incident::closed(start, log.timestamp, false));
                open = None;
            }
            _ => {}
        }
    }

    if let Some(start) = open {
        // Never end before the last closed incident, even if `now` lags the logs
        let floor = incidents.last().map_or(start, |last: &Incident| last.end_time.max(start));
        incidents.push(Incident::closed(start, now.max(floor), true));
    }

    let skip = incidents.len().saturating_sub(limit);
    incidents.split_off(skip)
}

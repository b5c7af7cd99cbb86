use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::incidents::{DEFAULT_INCIDENT_LIMIT, Incident, detect_incidents};
use super::stats::{Period, StatsReport, UptimeStats, compute_stats};
use crate::database::Database;
use crate::database::models::{Monitor, PingLog};

/// Upper bound for recent-activity requests
pub const MAX_RECENT_LIMIT: usize = 500;
/// Window and size of the log excerpt shown with monitor details
const DETAIL_WINDOW_HOURS: i64 = 24;
const DETAIL_LOG_LIMIT: usize = 100;

/// Stats plus the incidents of the same window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSummary {
    #[serde(flatten)]
    pub stats: UptimeStats,
    pub incidents: Vec<Incident>,
}

/// A monitor with its latest ping logs, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorDetails {
    pub monitor: Monitor,
    pub recent_logs: Vec<PingLog>,
}

/// Read-only query path used by the dashboard.
///
/// Every method returns `Ok(None)` for unknown monitors.
#[derive(Clone)]
pub struct MonitorQueries {
    database: Arc<dyn Database>,
}

impl MonitorQueries {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }

    async fn window(&self, monitor_id: Uuid, period: &Period, now: DateTime<Utc>) -> Result<Vec<PingLog>> {
        self.database.ping_logs_between(monitor_id, period.start(now), now).await
    }

    /// Uptime, averages and the hourly chart for the window ending at `now`
    pub async fn get_stats(
        &self,
        monitor_id: Uuid,
        period: &Period,
        now: DateTime<Utc>,
    ) -> Result<Option<StatsReport>> {
        if self.database.get_monitor(monitor_id).await?.is_none() {
            return Ok(None);
        }

        let logs = self.window(monitor_id, period, now).await?;
        Ok(Some(compute_stats(&logs, period)))
    }

    /// Stats plus the most recent incidents of the window
    pub async fn get_summary(
        &self,
        monitor_id: Uuid,
        period: &Period,
        now: DateTime<Utc>,
    ) -> Result<Option<MonitorSummary>> {
        if self.database.get_monitor(monitor_id).await?.is_none() {
            return Ok(None);
        }

        let logs = self.window(monitor_id, period, now).await?;
        Ok(Some(MonitorSummary {
            stats: compute_stats(&logs, period).stats,
            incidents: detect_incidents(&logs, now, DEFAULT_INCIDENT_LIMIT),
        }))
    }

    /// Last `limit` ping logs, newest first
    pub async fn recent_activity(&self, monitor_id: Uuid, limit: usize) -> Result<Option<Vec<PingLog>>> {
        if self.database.get_monitor(monitor_id).await?.is_none() {
            return Ok(None);
        }

        let limit = limit.clamp(1, MAX_RECENT_LIMIT);
        Ok(Some(self.database.recent_ping_logs(monitor_id, limit).await?))
    }

    /// The monitor and its ping logs of the last 24 hours
    pub async fn monitor_details(&self, monitor_id: Uuid, now: DateTime<Utc>) -> Result<Option<MonitorDetails>> {
        let Some(monitor) = self.database.get_monitor(monitor_id).await? else {
            return Ok(None);
        };

        let since = now - TimeDelta::hours(DETAIL_WINDOW_HOURS);
        let mut recent_logs = self.database.ping_logs_between(monitor_id, since, now).await?;
        recent_logs.reverse();
        recent_logs.truncate(DETAIL_LOG_LIMIT);

        Ok(Some(MonitorDetails { monitor, recent_logs }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::open_database;
    use crate::monitoring::types::PingStatus;
    use tempfile::{TempDir, tempdir};

    async fn seeded() -> (TempDir, Arc<dyn Database>, MonitorQueries, Monitor, DateTime<Utc>) {
        let dir = tempdir().unwrap();
        let database: Arc<dyn Database> =
            Arc::new(open_database(&dir.path().join("query.db"), 4).await.unwrap());
        let monitor = Monitor::new("api", "https://example.com", "ops@example.com");
        database.save_monitor(&monitor).await.unwrap();

        // Stored timestamps carry millisecond precision
        let now = DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap();
        // t0..t2 fail, t3 succeeds, then six more successes
        for i in 0..10i64 {
            let status = if (0..3).contains(&i) { PingStatus::Failure } else { PingStatus::Success };
            database
                .append_ping_log(&PingLog {
                    id: None,
                    monitor_id: monitor.id,
                    timestamp: now - TimeDelta::minutes(30 - i),
                    status,
                    response_time: status.is_success().then_some(120),
                    status_code: Some(if status.is_success() { 200 } else { 500 }),
                    error_message: (!status.is_success()).then(|| "HTTP 500 Internal Server Error".to_string()),
                })
                .await
                .unwrap();
        }

        let queries = MonitorQueries::new(database.clone());
        (dir, database, queries, monitor, now)
    }

    #[tokio::test]
    async fn test_stats_over_window() {
        let (_dir, _db, queries, monitor, now) = seeded().await;

        let report = queries.get_stats(monitor.id, &Period::hours(1), now).await.unwrap().unwrap();
        assert_eq!(report.stats.total_pings, 10);
        assert_eq!(report.stats.successful_pings, 7);
        assert_eq!(report.stats.uptime, 70.0);
        assert_eq!(report.stats.avg_response_time, 120);

        let total: u64 = report.chart_data.iter().map(|b| b.total).sum();
        assert_eq!(total, 10);
    }

    #[tokio::test]
    async fn test_stats_are_idempotent() {
        let (_dir, _db, queries, monitor, now) = seeded().await;
        let period = Period::hours(24);

        let first = queries.get_stats(monitor.id, &period, now).await.unwrap();
        let second = queries.get_stats(monitor.id, &period, now).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_summary_reports_incident() {
        let (_dir, _db, queries, monitor, now) = seeded().await;

        let summary = queries.get_summary(monitor.id, &Period::hours(1), now).await.unwrap().unwrap();
        assert_eq!(summary.incidents.len(), 1);
        let incident = &summary.incidents[0];
        assert_eq!(incident.start_time, now - TimeDelta::minutes(30));
        assert_eq!(incident.end_time, now - TimeDelta::minutes(27));
        assert_eq!(incident.duration, 3 * 60_000);
        assert!(!incident.ongoing);
    }

    #[tokio::test]
    async fn test_recent_activity_newest_first() {
        let (_dir, _db, queries, monitor, _now) = seeded().await;

        let logs = queries.recent_activity(monitor.id, 3).await.unwrap().unwrap();
        assert_eq!(logs.len(), 3);
        assert!(logs[0].timestamp > logs[1].timestamp);
        assert!(logs.iter().all(|l| l.status == PingStatus::Success));
    }

    #[tokio::test]
    async fn test_unknown_monitor() {
        let (_dir, _db, queries, _monitor, now) = seeded().await;
        let missing = Uuid::new_v4();

        assert!(queries.get_stats(missing, &Period::default(), now).await.unwrap().is_none());
        assert!(queries.recent_activity(missing, 10).await.unwrap().is_none());
        assert!(queries.monitor_details(missing, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_monitor_details_include_last_day() {
        let (_dir, _db, queries, monitor, now) = seeded().await;

        let details = queries.monitor_details(monitor.id, now).await.unwrap().unwrap();
        assert_eq!(details.monitor.id, monitor.id);
        assert_eq!(details.recent_logs.len(), 10);
        assert!(details.recent_logs[0].timestamp > details.recent_logs[9].timestamp);
    }
}

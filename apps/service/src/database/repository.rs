use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use libsql::{Row, params};
use uuid::Uuid;

use super::models::{AggregateUpdate, Monitor, PingLog, i64_to_timestamp, timestamp_to_i64};
use crate::monitoring::types::{MonitorStatus, PingStatus};
use crate::monitoring::validation::validate_monitor;
use crate::pool::LibsqlPool;

/// Ping logs older than this are invisible to queries and purged
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

const MONITOR_COLUMNS: &str = "uuid, name, owner_contact, url, interval_ms, timeout_ms, active, status, last_checked_at, total_checks, successful_checks, uptime, created_at, updated_at";
const PING_LOG_COLUMNS: &str =
    "id, monitor_uuid, timestamp, status, response_time_ms, status_code, error_message";

/// Database trait for abstracting the monitor directory, aggregate
/// persistence and the ping log store
#[async_trait]
pub trait Database: Send + Sync {
    /// Get all active monitors
    async fn get_active_monitors(&self) -> Result<Vec<Monitor>>;

    /// Get a monitor by id
    async fn get_monitor(&self, id: Uuid) -> Result<Option<Monitor>>;

    /// Insert a monitor, or update its configuration fields if it exists.
    /// Counters and status of an existing monitor are left untouched.
    async fn save_monitor(&self, monitor: &Monitor) -> Result<()>;

    /// Delete a monitor together with its ping logs
    async fn delete_monitor(&self, id: Uuid) -> Result<()>;

    /// Write the aggregate produced by one probe.
    ///
    /// Conditional on the stored `total_checks` still being
    /// `expected_total_checks`, the value seen in the pre-probe snapshot.
    async fn apply_check(
        &self,
        id: Uuid,
        expected_total_checks: u64,
        update: &AggregateUpdate,
    ) -> Result<()>;

    /// Append a ping log entry
    async fn append_ping_log(&self, log: &PingLog) -> Result<i64>;

    /// Ping logs with `from <= timestamp <= to`, oldest first
    async fn ping_logs_between(
        &self,
        monitor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PingLog>>;

    /// The `limit` most recent ping logs, newest first
    async fn recent_ping_logs(&self, monitor_id: Uuid, limit: usize) -> Result<Vec<PingLog>>;

    /// Remove ping logs older than `cutoff`, returns the number removed
    async fn purge_ping_logs_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Window in which ping logs are visible to queries
    fn retention(&self) -> TimeDelta;
}

/// LibSQL database implementation
pub struct DatabaseImpl {
    pool: LibsqlPool,
    retention: TimeDelta,
}

impl DatabaseImpl {
    /// Create a new database instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool, retention: TimeDelta::days(DEFAULT_RETENTION_DAYS) }
    }

    /// Override the ping log retention window
    pub fn with_retention(mut self, retention: TimeDelta) -> Self {
        self.retention = retention;
        self
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<crate::pool::LibsqlManager>> {
        self.pool.get().await.map_err(|e| anyhow!("Failed to get database connection: {}", e))
    }

    /// Oldest timestamp still inside the retention window
    fn retention_floor(&self) -> DateTime<Utc> {
        Utc::now() - self.retention
    }
}

fn monitor_from_row(row: &Row) -> Result<Monitor> {
    let uuid_str: String = row.get(0)?;
    let status_str: String = row.get(7)?;

    Ok(Monitor {
        id: Uuid::parse_str(&uuid_str)?,
        name: row.get(1)?,
        owner_contact: row.get(2)?,
        url: row.get(3)?,
        interval_ms: row.get::<i64>(4)? as u64,
        timeout_ms: row.get::<i64>(5)? as u64,
        active: row.get::<i64>(6)? != 0,
        status: MonitorStatus::parse(&status_str),
        last_checked_at: row.get::<Option<i64>>(8)?.map(i64_to_timestamp),
        total_checks: row.get::<i64>(9)? as u64,
        successful_checks: row.get::<i64>(10)? as u64,
        uptime: row.get::<f64>(11)?,
        created_at: i64_to_timestamp(row.get(12)?),
        updated_at: i64_to_timestamp(row.get(13)?),
    })
}

fn ping_log_from_row(row: &Row) -> Result<PingLog> {
    let monitor_uuid_str: String = row.get(1)?;
    let status_str: String = row.get(3)?;
    let status = PingStatus::parse(&status_str)
        .ok_or_else(|| anyhow!("Unknown ping status in storage: {}", status_str))?;

    Ok(PingLog {
        id: Some(row.get(0)?),
        monitor_id: Uuid::parse_str(&monitor_uuid_str)?,
        timestamp: i64_to_timestamp(row.get(2)?),
        status,
        response_time: row.get::<Option<i64>>(4)?.map(|v| v as u64),
        status_code: row.get::<Option<i64>>(5)?.map(|v| v as u16),
        error_message: row.get(6)?,
    })
}

#[async_trait]
impl Database for DatabaseImpl {
    fn retention(&self) -> TimeDelta {
        self.retention
    }

    async fn get_active_monitors(&self) -> Result<Vec<Monitor>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(&format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE active = 1"), ())
            .await?;

        let mut monitors = Vec::new();
        while let Some(row) = rows.next().await? {
            monitors.push(monitor_from_row(&row)?);
        }

        Ok(monitors)
    }

    async fn get_monitor(&self, id: Uuid) -> Result<Option<Monitor>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE uuid = ?"),
                params![id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(monitor_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_monitor(&self, monitor: &Monitor) -> Result<()> {
        validate_monitor(monitor)?;

        let conn = self.get_conn().await?;
        conn.execute(
            &format!(
                "INSERT INTO monitors ({MONITOR_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(uuid) DO UPDATE SET
                    name = excluded.name,
                    owner_contact = excluded.owner_contact,
                    url = excluded.url,
                    interval_ms = excluded.interval_ms,
                    timeout_ms = excluded.timeout_ms,
                    active = excluded.active,
                    updated_at = excluded.updated_at"
            ),
            params![
                monitor.id.to_string(),
                monitor.name.clone(),
                monitor.owner_contact.clone(),
                monitor.url.clone(),
                monitor.interval_ms as i64,
                monitor.timeout_ms as i64,
                if monitor.active { 1 } else { 0 },
                monitor.status.to_string(),
                monitor.last_checked_at.map(timestamp_to_i64),
                monitor.total_checks as i64,
                monitor.successful_checks as i64,
                monitor.uptime,
                timestamp_to_i64(monitor.created_at),
                timestamp_to_i64(monitor.updated_at)
            ],
        )
        .await?;

        Ok(())
    }

    async fn delete_monitor(&self, id: Uuid) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute("DELETE FROM ping_logs WHERE monitor_uuid = ?", params![id.to_string()])
            .await?;
        conn.execute("DELETE FROM monitors WHERE uuid = ?", params![id.to_string()]).await?;
        Ok(())
    }

    async fn apply_check(
        &self,
        id: Uuid,
        expected_total_checks: u64,
        update: &AggregateUpdate,
    ) -> Result<()> {
        let conn = self.get_conn().await?;
        let checked_at = timestamp_to_i64(update.last_checked_at);

        let changed = conn
            .execute(
                "UPDATE monitors SET status = ?, last_checked_at = ?, total_checks = ?, successful_checks = ?, uptime = ?, updated_at = ?
                 WHERE uuid = ? AND total_checks = ?",
                params![
                    update.status.to_string(),
                    checked_at,
                    update.total_checks as i64,
                    update.successful_checks as i64,
                    update.uptime,
                    checked_at,
                    id.to_string(),
                    expected_total_checks as i64
                ],
            )
            .await?;

        if changed == 0 {
            return Err(anyhow!(
                "Monitor {} was removed or updated concurrently (expected {} total checks)",
                id,
                expected_total_checks
            ));
        }

        Ok(())
    }

    async fn append_ping_log(&self, log: &PingLog) -> Result<i64> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO ping_logs (monitor_uuid, timestamp, status, response_time_ms, status_code, error_message) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                log.monitor_id.to_string(),
                timestamp_to_i64(log.timestamp),
                log.status.to_string(),
                log.response_time.map(|v| v as i64),
                log.status_code.map(|v| v as i64),
                log.error_message.clone()
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn ping_logs_between(
        &self,
        monitor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PingLog>> {
        let from = from.max(self.retention_floor());
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {PING_LOG_COLUMNS} FROM ping_logs WHERE monitor_uuid = ? AND timestamp >= ? AND timestamp <= ? ORDER BY timestamp ASC, id ASC"
                ),
                params![monitor_id.to_string(), timestamp_to_i64(from), timestamp_to_i64(to)],
            )
            .await?;

        let mut logs = Vec::new();
        while let Some(row) = rows.next().await? {
            logs.push(ping_log_from_row(&row)?);
        }

        Ok(logs)
    }

    async fn recent_ping_logs(&self, monitor_id: Uuid, limit: usize) -> Result<Vec<PingLog>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {PING_LOG_COLUMNS} FROM ping_logs WHERE monitor_uuid = ? AND timestamp >= ? ORDER BY timestamp DESC, id DESC LIMIT ?"
                ),
                params![
                    monitor_id.to_string(),
                    timestamp_to_i64(self.retention_floor()),
                    limit as i64
                ],
            )
            .await?;

        let mut logs = Vec::new();
        while let Some(row) = rows.next().await? {
            logs.push(ping_log_from_row(&row)?);
        }

        Ok(logs)
    }

    async fn purge_ping_logs_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let conn = self.get_conn().await?;
        let removed = conn
            .execute("DELETE FROM ping_logs WHERE timestamp < ?", params![timestamp_to_i64(cutoff)])
            .await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::open_database;
    use tempfile::{TempDir, tempdir};

    async fn test_database() -> Result<(TempDir, DatabaseImpl)> {
        let dir = tempdir()?;
        let database = open_database(&dir.path().join("repo.db"), 4).await?;
        Ok((dir, database))
    }

    fn log_at(monitor_id: Uuid, timestamp: DateTime<Utc>, status: PingStatus) -> PingLog {
        PingLog {
            id: None,
            monitor_id,
            timestamp,
            status,
            response_time: Some(42),
            status_code: Some(200),
            error_message: None,
        }
    }

    #[tokio::test]
    async fn test_save_and_load_monitor() -> Result<()> {
        let (_dir, db) = test_database().await?;
        let monitor = Monitor::new("Homepage", "https://example.com", "ops@example.com");
        db.save_monitor(&monitor).await?;

        let loaded = db.get_monitor(monitor.id).await?.expect("monitor saved");
        assert_eq!(loaded.name, "Homepage");
        assert_eq!(loaded.status, MonitorStatus::Unknown);
        assert_eq!(loaded.last_checked_at, None);
        assert_eq!(db.get_active_monitors().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_monitor() -> Result<()> {
        let (_dir, db) = test_database().await?;
        let mut monitor = Monitor::new("Homepage", "https://example.com", "ops@example.com");
        monitor.interval_ms = 1_000;
        assert!(db.save_monitor(&monitor).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_monitors_are_not_listed() -> Result<()> {
        let (_dir, db) = test_database().await?;
        let mut monitor = Monitor::new("Paused", "https://example.com", "ops@example.com");
        monitor.active = false;
        db.save_monitor(&monitor).await?;

        assert!(db.get_active_monitors().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_check_is_conditional_on_snapshot() -> Result<()> {
        let (_dir, db) = test_database().await?;
        let monitor = Monitor::new("Homepage", "https://example.com", "ops@example.com");
        db.save_monitor(&monitor).await?;

        let update = AggregateUpdate {
            status: MonitorStatus::Up,
            last_checked_at: Utc::now(),
            total_checks: 1,
            successful_checks: 1,
            uptime: 100.0,
        };
        db.apply_check(monitor.id, 0, &update).await?;

        // A second writer holding the same stale snapshot must not clobber it
        assert!(db.apply_check(monitor.id, 0, &update).await.is_err());

        let loaded = db.get_monitor(monitor.id).await?.expect("monitor saved");
        assert_eq!(loaded.total_checks, 1);
        assert_eq!(loaded.status, MonitorStatus::Up);
        Ok(())
    }

    #[tokio::test]
    async fn test_ping_logs_are_ordered_and_retained() -> Result<()> {
        let (_dir, db) = test_database().await?;
        let id = Uuid::new_v4();
        let now = Utc::now();

        db.append_ping_log(&log_at(id, now - TimeDelta::minutes(1), PingStatus::Failure)).await?;
        db.append_ping_log(&log_at(id, now - TimeDelta::minutes(3), PingStatus::Success)).await?;
        db.append_ping_log(&log_at(id, now - TimeDelta::days(31), PingStatus::Success)).await?;

        let logs = db.ping_logs_between(id, now - TimeDelta::days(60), now).await?;
        assert_eq!(logs.len(), 2, "expired entry must be hidden");
        assert!(logs[0].timestamp < logs[1].timestamp);

        let recent = db.recent_ping_logs(id, 10).await?;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].status, PingStatus::Failure);

        let removed = db.purge_ping_logs_before(now - TimeDelta::days(30)).await?;
        assert_eq!(removed, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_monitor_removes_logs() -> Result<()> {
        let (_dir, db) = test_database().await?;
        let monitor = Monitor::new("Homepage", "https://example.com", "ops@example.com");
        db.save_monitor(&monitor).await?;
        db.append_ping_log(&log_at(monitor.id, Utc::now(), PingStatus::Success)).await?;

        db.delete_monitor(monitor.id).await?;

        assert!(db.get_monitor(monitor.id).await?.is_none());
        assert!(db.recent_ping_logs(monitor.id, 10).await?.is_empty());
        Ok(())
    }
}

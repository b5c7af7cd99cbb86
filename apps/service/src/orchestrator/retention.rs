//! Automatic retention of the ping log.
//!
//! Ping logs older than the retention window (30 days by default) are never
//! returned by queries; this task also removes them from disk. Cleanup runs
//! periodically (every hour by default) as a background task.

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::RetentionConfig;
use crate::database::Database;

/// Retention policy for the ping log
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Days to keep ping logs
    pub ping_log_days: i64,
    /// Time between cleanup runs
    pub cleanup_interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { ping_log_days: 30, cleanup_interval: Duration::from_secs(3600) }
    }
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            ping_log_days: config.window().num_days(),
            cleanup_interval: config.cleanup_interval(),
        }
    }
}

impl RetentionPolicy {
    pub fn window(&self) -> TimeDelta {
        TimeDelta::days(self.ping_log_days)
    }

    /// Entries strictly older than this are expired at `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window()
    }
}

/// Cleanup manager for expired ping logs
pub struct RetentionCleanup {
    database: Arc<dyn Database>,
    policy: RetentionPolicy,
}

impl RetentionCleanup {
    /// Create a new retention cleanup manager
    pub fn new(database: Arc<dyn Database>, policy: RetentionPolicy) -> Self {
        Self { database, policy }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Delete ping logs that fell out of the window at `now`
    pub async fn cleanup_expired_results(&self, now: DateTime<Utc>) -> Result<u64> {
        let cutoff = self.policy.cutoff(now);
        debug!(
            "Cleaning up ping logs older than {} days (cutoff: {})",
            self.policy.ping_log_days, cutoff
        );

        let deleted = self.database.purge_ping_logs_before(cutoff).await?;
        info!("Retention cleanup completed: {} ping logs deleted", deleted);

        Ok(deleted)
    }

    /// Start background cleanup task; a failed run is retried on the next one
    pub fn start_periodic_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let database = Arc::clone(&self.database);
        let policy = self.policy.clone();

        tokio::spawn(async move {
            let cleanup = RetentionCleanup::new(database, policy);
            let mut interval = tokio::time::interval(cleanup.policy.cleanup_interval);

            loop {
                interval.tick().await;

                if let Err(e) = cleanup.cleanup_expired_results(Utc::now()).await {
                    warn!("Periodic ping log cleanup failed: {:#}", e);
                }
            }
        })
    }
}

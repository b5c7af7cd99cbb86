use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::types::{CheckResult, ProbeOutcome};
use crate::database::Database;
use crate::database::models::{AggregateUpdate, Monitor, PingLog};
use crate::events::{EventPublisher, MonitorUpdate};
use crate::notify::Notifier;

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Uptime percentage, 0 when nothing was checked yet
pub fn uptime_percent(successful: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(successful as f64 * 100.0 / total as f64)
}

/// Fold one probe outcome into the pre-probe aggregate
pub fn next_aggregate(
    snapshot: &Monitor,
    outcome: &ProbeOutcome,
    completed_at: DateTime<Utc>,
) -> AggregateUpdate {
    let total_checks = snapshot.total_checks + 1;
    let successful_checks = snapshot.successful_checks + u64::from(outcome.is_success());

    AggregateUpdate {
        status: outcome.status.monitor_status(),
        last_checked_at: completed_at,
        total_checks,
        successful_checks,
        uptime: uptime_percent(successful_checks, total_checks),
    }
}

/// Upper bound for one status change notification
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);

/// Applies completed checks to the monitor aggregate, the ping log, alerts
/// and live subscribers
pub struct StatusTracker {
    database: Arc<dyn Database>,
    notifier: Arc<dyn Notifier>,
    publisher: EventPublisher,
    notify_timeout: Duration,
}

impl StatusTracker {
    pub fn new(
        database: Arc<dyn Database>,
        notifier: Arc<dyn Notifier>,
        publisher: EventPublisher,
    ) -> Self {
        Self { database, notifier, publisher, notify_timeout: DEFAULT_NOTIFY_TIMEOUT }
    }

    pub fn with_notify_timeout(mut self, notify_timeout: Duration) -> Self {
        self.notify_timeout = notify_timeout;
        self
    }

    /// Record one completed check for `snapshot`, the monitor as it was when
    /// the probe started.
    ///
    /// The ping log is appended even when the aggregate write fails, unless
    /// the monitor was deleted meanwhile. Live events and alerts only follow
    /// a persisted aggregate, and the alert goes last so a slow notifier
    /// cannot hold up the log or the event. Returns the updated monitor.
    pub async fn record(&self, snapshot: &Monitor, result: &CheckResult) -> Result<Monitor> {
        let update = next_aggregate(snapshot, &result.outcome, result.completed_at);

        let persisted = self.database.apply_check(snapshot.id, snapshot.total_checks, &update).await;
        if let Err(e) = &persisted {
            error!(monitor = %snapshot.id, "Failed to update monitor aggregate: {:#}", e);
        }

        let appended = if persisted.is_err() && self.is_removed(snapshot).await {
            info!(monitor = %snapshot.id, "Monitor was deleted during its check, dropping the ping log");
            Ok(())
        } else {
            self.database
                .append_ping_log(&PingLog::from_check_result(result))
                .await
                .map(|_| ())
        };
        if let Err(e) = &appended {
            error!(monitor = %snapshot.id, "Failed to save ping log: {:#}", e);
        }

        persisted?;
        let updated = update.applied_to(snapshot);
        self.publisher.publish(MonitorUpdate::new(&updated, result));

        if snapshot.status.is_transition_to(updated.status) {
            info!(
                monitor = %snapshot.id,
                from = %snapshot.status,
                to = %updated.status,
                "Monitor status changed"
            );
            self.notify(&updated, result).await;
        }

        appended?;
        Ok(updated)
    }

    async fn is_removed(&self, snapshot: &Monitor) -> bool {
        matches!(self.database.get_monitor(snapshot.id).await, Ok(None))
    }

    async fn notify(&self, monitor: &Monitor, result: &CheckResult) {
        let sent = timeout(
            self.notify_timeout,
            self.notifier.notify_status_change(
                &monitor.owner_contact,
                &monitor.name,
                monitor.status,
                result.outcome.error_message.as_deref(),
            ),
        )
        .await;

        match sent {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(monitor = %monitor.id, "Failed to send status change notification: {}", e),
            Err(_) => warn!(
                monitor = %monitor.id,
                "Status change notification timed out after {}ms",
                self.notify_timeout.as_millis()
            ),
        }
    }
}

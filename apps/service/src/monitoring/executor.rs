use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use super::checker::Checker;
use super::types::CheckResult;
use crate::database::models::Monitor;

/// Monitoring executor - runs one probe for a monitor and timestamps it
pub struct MonitoringExecutor {
    checker: Arc<dyn Checker>,
}

impl MonitoringExecutor {
    pub fn new(checker: Arc<dyn Checker>) -> Self {
        Self { checker }
    }

    /// Execute a monitoring check against the monitor's URL and timeout
    pub async fn execute_check(&self, monitor: &Monitor) -> CheckResult {
        let started_at = Utc::now();
        let outcome = self
            .checker
            .probe(&monitor.url, Duration::from_millis(monitor.timeout_ms))
            .await;
        let completed_at = Utc::now();

        tracing::debug!(
            monitor = %monitor.id,
            url = %monitor.url,
            status = %outcome.status,
            response_time_ms = ?outcome.response_time_ms,
            "Probe completed"
        );

        CheckResult { monitor_id: monitor.id, started_at, completed_at, outcome }
    }
}

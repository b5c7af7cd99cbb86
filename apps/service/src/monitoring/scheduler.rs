use chrono::{DateTime, Utc};
use dashmap::DashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::executor::MonitoringExecutor;
use super::tracker::StatusTracker;
use crate::database::Database;
use crate::database::models::Monitor;

/// Default scheduler tick, one minute
pub const DEFAULT_TICK: Duration = Duration::from_secs(60);

/// Holds a monitor's in-flight slot; the slot is released on drop, whether
/// the check finished, failed, panicked or was aborted.
pub struct InFlightGuard {
    in_flight: Arc<DashSet<Uuid>>,
    monitor_id: Uuid,
}

impl InFlightGuard {
    /// Claim the slot for `monitor_id`, `None` if a check is already running
    pub fn acquire(in_flight: &Arc<DashSet<Uuid>>, monitor_id: Uuid) -> Option<Self> {
        in_flight
            .insert(monitor_id)
            .then(|| Self { in_flight: Arc::clone(in_flight), monitor_id })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.monitor_id);
    }
}

/// Monitors whose interval has elapsed at `now`
pub fn due_monitors(monitors: Vec<Monitor>, now: DateTime<Utc>) -> Vec<Monitor> {
    monitors.into_iter().filter(|m| m.active && m.is_due(now)).collect()
}

/// Monitoring scheduler - wakes on a fixed tick and dispatches due checks
pub struct MonitoringScheduler {
    database: Arc<dyn Database>,
    executor: Arc<MonitoringExecutor>,
    tracker: Arc<StatusTracker>,
    in_flight: Arc<DashSet<Uuid>>,
    tick: Duration,
}

impl MonitoringScheduler {
    /// Create a new monitoring scheduler
    pub fn new(
        database: Arc<dyn Database>,
        executor: Arc<MonitoringExecutor>,
        tracker: Arc<StatusTracker>,
        tick: Duration,
    ) -> Self {
        Self { database, executor, tracker, in_flight: Arc::new(DashSet::new()), tick }
    }

    /// Whether a check for `monitor_id` is currently running
    pub fn is_in_flight(&self, monitor_id: Uuid) -> bool {
        self.in_flight.contains(&monitor_id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Evaluate every active monitor once and dispatch the due ones.
    ///
    /// Each check runs on its own task so a hanging endpoint never holds up
    /// the tick. Returns the handles of the dispatched checks.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Vec<JoinHandle<()>> {
        let monitors = match self.database.get_active_monitors().await {
            Ok(monitors) => monitors,
            Err(e) => {
                error!("Failed to load active monitors: {:#}", e);
                return Vec::new();
            }
        };

        let due = due_monitors(monitors, now);
        let mut handles = Vec::with_capacity(due.len());

        for monitor in due {
            let Some(guard) = InFlightGuard::acquire(&self.in_flight, monitor.id) else {
                debug!(monitor = %monitor.id, "Previous check still running, skipping");
                continue;
            };

            handles.push(self.dispatch(monitor, guard));
        }

        if !handles.is_empty() {
            debug!(dispatched = handles.len(), "Scheduler tick dispatched checks");
        }

        handles
    }

    fn dispatch(&self, monitor: Monitor, guard: InFlightGuard) -> JoinHandle<()> {
        let executor = Arc::clone(&self.executor);
        let tracker = Arc::clone(&self.tracker);

        tokio::spawn(async move {
            let _guard = guard;

            let result = executor.execute_check(&monitor).await;

            match tracker.record(&monitor, &result).await {
                Ok(updated) => info!(
                    "Monitor {} - {} - Status: {} - Latency: {:?}ms",
                    monitor.name, monitor.url, updated.status, result.outcome.response_time_ms
                ),
                Err(e) => warn!(monitor = %monitor.id, "Check was not fully recorded: {:#}", e),
            }
        })
    }

    /// Start the periodic driver. The first tick fires immediately.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval(self.tick);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(tick_seconds = self.tick.as_secs(), "Scheduler started");

            loop {
                timer.tick().await;
                // Dispatched checks are detached; the guard set tracks them
                self.run_tick(Utc::now()).await;
            }
        })
    }
}

/// Orchestrator module - coordinates all components
///
/// The [`Engine`] is the core coordinator that:
/// - Wires the checker, tracker, notifier and publisher together
/// - Owns the scheduler driver and the retention task
/// - Hands out the read-only query API
///
/// All state lives in the engine value, so several engines (e.g. one per
/// test) can run side by side in one process.
pub mod retention;


pub use retention::{RetentionCleanup, RetentionPolicy};

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::analytics::MonitorQueries;
use crate::config::Config;
use crate::database::{Database, open_database};
use crate::events::{EventPublisher, SubscriberRegistry};
use crate::monitoring::checker::{Checker, HttpChecker};
use crate::monitoring::{MonitoringExecutor, MonitoringScheduler, StatusTracker};
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};

/// How long `stop` waits for running checks to be recorded
const DRAIN_TIMEOUT: Duration = Duration::from_secs(90);
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Main monitoring engine
pub struct Engine {
    database: Arc<dyn Database>,
    scheduler: Arc<MonitoringScheduler>,
    retention: RetentionCleanup,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    /// Assemble an engine from explicit collaborators.
    ///
    /// The ping log window is the one `database` was opened with; `open`
    /// applies `retention.ping_log_days` from the config to it.
    pub fn new(
        config: &Config,
        database: Arc<dyn Database>,
        checker: Arc<dyn Checker>,
        notifier: Arc<dyn Notifier>,
        registry: Arc<dyn SubscriberRegistry>,
    ) -> Self {
        let executor = Arc::new(MonitoringExecutor::new(checker));
        let tracker = Arc::new(StatusTracker::new(
            database.clone(),
            notifier,
            EventPublisher::new(registry),
        ));
        let scheduler = Arc::new(MonitoringScheduler::new(
            database.clone(),
            executor,
            tracker,
            config.scheduler.tick(),
        ));
        // Purge with the same window the database filters queries with
        let mut policy = RetentionPolicy::from(&config.retention);
        let window = database.retention().num_days();
        if window != policy.ping_log_days {
            warn!(
                "Database keeps ping logs {}d but the config asks for {}d, using {}d",
                window, policy.ping_log_days, window
            );
            policy.ping_log_days = window;
        }
        let retention = RetentionCleanup::new(database.clone(), policy);

        Self { database, scheduler, retention, task_handles: Mutex::new(Vec::new()) }
    }

    /// Build the HTTP checker and notifier the configuration asks for
    pub fn from_config(
        config: &Config,
        database: Arc<dyn Database>,
        registry: Arc<dyn SubscriberRegistry>,
    ) -> Result<Self> {
        let checker = Arc::new(HttpChecker::new(&config.probe.user_agent)?);

        let notifier: Arc<dyn Notifier> = match &config.notifications.webhook_url {
            Some(url) => {
                info!("Status change alerts go to webhook {}", url);
                Arc::new(WebhookNotifier::new(url.clone())?)
            }
            None => {
                info!("No alert webhook configured, status changes are only logged");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self::new(config, database, checker, notifier, registry))
    }

    /// Open the configured database and build the engine on top of it
    pub async fn open(config: &Config, registry: Arc<dyn SubscriberRegistry>) -> Result<Self> {
        info!("Opening database...");
        let database = open_database(&config.database.path, config.database.max_connections)
            .await?
            .with_retention(config.retention.window());

        Self::from_config(config, Arc::new(database), registry)
    }

    pub fn database(&self) -> Arc<dyn Database> {
        Arc::clone(&self.database)
    }

    pub fn retention_policy(&self) -> &RetentionPolicy {
        self.retention.policy()
    }

    pub fn scheduler(&self) -> &Arc<MonitoringScheduler> {
        &self.scheduler
    }

    /// Read-only dashboard queries over this engine's storage
    pub fn queries(&self) -> MonitorQueries {
        MonitorQueries::new(self.database())
    }

    pub async fn is_running(&self) -> bool {
        !self.task_handles.lock().await.is_empty()
    }

    /// Start the scheduler driver and the retention task; no-op when running
    pub async fn start(&self) {
        let mut handles = self.task_handles.lock().await;
        if !handles.is_empty() {
            warn!("Engine already running");
            return;
        }

        info!("Starting monitoring engine...");
        handles.push(Arc::clone(&self.scheduler).start());

        info!(
            "Retention policy: ping logs kept {}d, cleanup every {}s",
            self.retention.policy().ping_log_days,
            self.retention.policy().cleanup_interval.as_secs()
        );
        handles.push(self.retention.start_periodic_cleanup());
    }

    /// Stop dispatching and wait for checks already running to be recorded
    pub async fn stop(&self) {
        let handles: Vec<_> = self.task_handles.lock().await.drain(..).collect();
        if handles.is_empty() {
            return;
        }

        for handle in &handles {
            handle.abort();
        }
        for handle in handles {
            let _ = handle.await;
        }

        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while self.scheduler.in_flight_count() > 0 {
                tokio::time::sleep(DRAIN_POLL).await;
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                in_flight = self.scheduler.in_flight_count(),
                "Stopped with checks still running"
            );
        }

        info!("Monitoring engine stopped");
    }
}

//! Real-time fan-out of monitor updates.
//!
//! The engine only knows [`EventPublisher::publish`]; who is listening is the
//! business of a [`SubscriberRegistry`]. The bundled [`BroadcastRegistry`] is
//! a tokio broadcast channel, so a slow or disconnected subscriber only loses
//! its own messages.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::database::models::Monitor;
use crate::monitoring::types::{CheckResult, MonitorStatus};

/// Name subscribers see for [`MonitorUpdate`] messages
pub const MONITOR_UPDATE_EVENT: &str = "monitorUpdate";

/// Compact status message sent after every completed probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorUpdate {
    pub monitor_id: Uuid,
    pub status: MonitorStatus,
    pub response_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl MonitorUpdate {
    /// Build the message from the post-update monitor and the check that produced it
    pub fn new(monitor: &Monitor, result: &CheckResult) -> Self {
        Self {
            monitor_id: monitor.id,
            status: monitor.status,
            response_time: result.outcome.response_time_ms,
            status_code: result.outcome.status_code,
            uptime: monitor.uptime,
            timestamp: result.completed_at,
            error_message: result.outcome.error_message.clone(),
        }
    }
}

/// Live subscriber registry, owned by whichever transport serves subscribers
pub trait SubscriberRegistry: Send + Sync {
    /// Deliver to every current subscriber, returns how many were reached
    fn broadcast(&self, update: &MonitorUpdate) -> usize;
}

/// Registry backed by a tokio broadcast channel
pub struct BroadcastRegistry {
    sender: broadcast::Sender<MonitorUpdate>,
}

impl BroadcastRegistry {
    /// `capacity` bounds how far a subscriber may lag before it skips messages
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorUpdate> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastRegistry {
    fn default() -> Self {
        Self::new(256)
    }
}

impl SubscriberRegistry for BroadcastRegistry {
    fn broadcast(&self, update: &MonitorUpdate) -> usize {
        // An error only means nobody is subscribed right now
        self.sender.send(update.clone()).unwrap_or(0)
    }
}

/// Publishes monitor updates to the registry
#[derive(Clone)]
pub struct EventPublisher {
    registry: Arc<dyn SubscriberRegistry>,
}

impl EventPublisher {
    pub fn new(registry: Arc<dyn SubscriberRegistry>) -> Self {
        Self { registry }
    }

    /// Best-effort delivery; nothing is kept for subscribers that are not listening
    pub fn publish(&self, update: MonitorUpdate) {
        let delivered = self.registry.broadcast(&update);
        debug!(
            monitor = %update.monitor_id,
            status = %update.status,
            delivered,
            "Published {}",
            MONITOR_UPDATE_EVENT
        );
    }
}

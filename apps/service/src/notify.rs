//! Status change alerts.
//!
//! Rendering and delivering the actual email lives outside the engine; it
//! only calls [`Notifier::notify_status_change`] once per up/down transition.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::monitoring::types::MonitorStatus;

/// Upper bound for one webhook delivery
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Webhook rejected the alert with status {0}")]
    Rejected(u16),
}

/// Notification collaborator interface
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_status_change(
        &self,
        owner_contact: &str,
        monitor_name: &str,
        new_status: MonitorStatus,
        error_detail: Option<&str>,
    ) -> Result<(), NotifyError>;
}

/// Writes alerts to the log; the default when no delivery channel is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_status_change(
        &self,
        owner_contact: &str,
        monitor_name: &str,
        new_status: MonitorStatus,
        error_detail: Option<&str>,
    ) -> Result<(), NotifyError> {
        match new_status {
            MonitorStatus::Down => warn!(
                target: "uptime::alerts",
                contact = %owner_contact,
                monitor = %monitor_name,
                error = error_detail.unwrap_or("unknown error"),
                "Monitor is down"
            ),
            _ => info!(
                target: "uptime::alerts",
                contact = %owner_contact,
                monitor = %monitor_name,
                "Monitor is {}",
                new_status
            ),
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AlertPayload<'a> {
    email: &'a str,
    monitor_name: &'a str,
    status: MonitorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_details: Option<&'a str>,
}

/// Posts alerts as JSON to a webhook, e.g. the mail service's intake endpoint
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        Self::with_timeout(url, DEFAULT_WEBHOOK_TIMEOUT)
    }

    /// Give up on a delivery after `timeout`, whether connecting or waiting for the reply
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, url))
    }

    /// Use a preconfigured client; it should carry its own timeout
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_status_change(
        &self,
        owner_contact: &str,
        monitor_name: &str,
        new_status: MonitorStatus,
        error_detail: Option<&str>,
    ) -> Result<(), NotifyError> {
        let payload = AlertPayload {
            email: owner_contact,
            monitor_name,
            status: new_status,
            error_details: error_detail,
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn local_webhook(url: String, timeout: Duration) -> WebhookNotifier {
        let client = reqwest::Client::builder().timeout(timeout).no_proxy().build().unwrap();
        WebhookNotifier::with_client(client, url)
    }

    /// Answer one request with a canned response
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}/alerts", addr)
    }

    /// Accept connections but never answer
    async fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        format!("http://{}/alerts", addr)
    }

    #[test]
    fn test_webhook_client_builds_with_timeout() {
        assert!(WebhookNotifier::new("http://mail.local/alerts").is_ok());
        assert!(WebhookNotifier::with_timeout("http://mail.local/alerts", Duration::from_millis(500)).is_ok());
    }

    #[tokio::test]
    async fn test_webhook_delivers_alert() {
        let url = serve_once("HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n").await;
        let notifier = local_webhook(url, Duration::from_secs(5));

        let sent = notifier
            .notify_status_change("ops@example.com", "api", MonitorStatus::Down, Some("HTTP 503"))
            .await;
        assert!(sent.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_rejection_is_reported() {
        let url = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let notifier = local_webhook(url, Duration::from_secs(5));

        let sent = notifier.notify_status_change("ops@example.com", "api", MonitorStatus::Up, None).await;
        assert!(matches!(sent, Err(NotifyError::Rejected(500))));
    }

    #[tokio::test]
    async fn test_silent_webhook_times_out() {
        let url = serve_silence().await;
        let notifier = local_webhook(url, Duration::from_millis(200));

        let sent = tokio::time::timeout(
            Duration::from_secs(5),
            notifier.notify_status_change("ops@example.com", "api", MonitorStatus::Down, None),
        )
        .await
        .expect("delivery gives up on its own");
        assert!(matches!(sent, Err(NotifyError::Network(e)) if e.is_timeout()));
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let notifier = LogNotifier;
        assert!(
            notifier
                .notify_status_change("ops@example.com", "api", MonitorStatus::Down, Some("HTTP 502"))
                .await
                .is_ok()
        );
    }

    #[test]
    fn test_alert_payload_shape() {
        let payload = AlertPayload {
            email: "ops@example.com",
            monitor_name: "api",
            status: MonitorStatus::Up,
            error_details: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["monitorName"], "api");
        assert_eq!(json["status"], "up");
        assert!(json.get("errorDetails").is_none());
    }
}

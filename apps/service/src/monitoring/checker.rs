use anyhow::Result;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use super::types::ProbeOutcome;

/// User agent sent with every probe unless configured otherwise
pub const DEFAULT_USER_AGENT: &str = "Uptime-Monitor-Bot/1.0";

/// Checker trait for probing a target
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Probe `target` once. Never fails: every problem is a failure outcome.
    async fn probe(&self, target: &str, timeout: Duration) -> ProbeOutcome;
}

/// HTTP/HTTPS checker issuing a single GET per probe
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;

        Ok(Self { client })
    }

    /// Use a preconfigured client, e.g. one with custom proxy or TLS settings
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn probe(&self, target: &str, limit: Duration) -> ProbeOutcome {
        let start = Instant::now();

        // `send` resolves once the response headers are in; the body is never read
        match timeout(limit, self.client.get(target).send()).await {
            Ok(Ok(response)) => classify_status(response.status(), elapsed_ms(start)),
            Ok(Err(e)) => ProbeOutcome::transport_failure(format!("HTTP request failed: {}", e)),
            Err(_) => ProbeOutcome::transport_failure(format!(
                "Request timed out after {}ms",
                limit.as_millis()
            )),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Classify a received response: only 2xx counts as up
pub fn classify_status(status: StatusCode, response_time_ms: u64) -> ProbeOutcome {
    if status.is_success() {
        ProbeOutcome::success(response_time_ms, status.as_u16())
    } else {
        ProbeOutcome::http_failure(response_time_ms, status.as_u16(), describe_status(status))
    }
}

/// Human readable `HTTP <code> <reason>`
fn describe_status(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    }
}

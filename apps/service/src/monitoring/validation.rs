//! Monitor configuration validation.
//!
//! Management collaborators are expected to validate their input, but the
//! storage layer re-checks the constraints the engine depends on before a
//! monitor is saved.

use anyhow::{Result, anyhow};
use url::Url;

use crate::database::models::Monitor;

/// Shortest allowed check interval, 1 minute
pub const MIN_INTERVAL_MS: u64 = 60_000;
pub const MIN_TIMEOUT_MS: u64 = 1_000;
pub const MAX_TIMEOUT_MS: u64 = 60_000;
const MAX_NAME_LEN: usize = 100;

/// Validate every monitor field the engine relies on
pub fn validate_monitor(monitor: &Monitor) -> Result<()> {
    validate_name(&monitor.name)?;
    validate_http_target(&monitor.url)?;
    validate_check_interval(monitor.interval_ms)?;
    validate_timeout(monitor.timeout_ms)?;

    if monitor.successful_checks > monitor.total_checks {
        return Err(anyhow!(
            "Successful checks ({}) exceed total checks ({})",
            monitor.successful_checks,
            monitor.total_checks
        ));
    }

    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
        return Err(anyhow!("Name must be between 1 and {} characters", MAX_NAME_LEN));
    }
    Ok(())
}

/// Validate HTTP/HTTPS target
pub fn validate_http_target(target: &str) -> Result<()> {
    let url = Url::parse(target).map_err(|e| anyhow!("Invalid URL: {}", e))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("Invalid scheme for HTTP monitor: {}", other)),
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL has no host: {}", target));
    }

    if url.port() == Some(0) {
        return Err(anyhow!("Port 0 is not valid"));
    }

    Ok(())
}

/// Validate check interval
pub fn validate_check_interval(interval_ms: u64) -> Result<()> {
    if interval_ms < MIN_INTERVAL_MS {
        return Err(anyhow!(
            "Interval must be at least {}ms (1 minute), got {}ms",
            MIN_INTERVAL_MS,
            interval_ms
        ));
    }
    Ok(())
}

/// Validate probe timeout
pub fn validate_timeout(timeout_ms: u64) -> Result<()> {
    if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&timeout_ms) {
        return Err(anyhow!(
            "Timeout must be between {}ms and {}ms, got {}ms",
            MIN_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
            timeout_ms
        ));
    }
    Ok(())
}

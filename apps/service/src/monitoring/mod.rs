pub mod checker;
/// Monitoring engine module - handles execution of monitoring checks
///
/// This module is responsible for:
/// - Probing HTTP/HTTPS targets
/// - Scheduling due checks on a fixed tick
/// - Folding outcomes into monitor status and uptime
pub mod executor;
pub mod scheduler;
pub mod tracker;
pub mod types;
pub mod validation;

pub use checker::{Checker, HttpChecker};
pub use executor::MonitoringExecutor;
pub use scheduler::MonitoringScheduler;
pub use tracker::StatusTracker;
pub use types::{CheckResult, MonitorStatus, PingStatus, ProbeOutcome};

/// Read side of the engine: stats, chart buckets and incidents derived from
/// the ping log. Nothing here mutates state.
pub mod incidents;
pub mod query;
pub mod stats;

pub use incidents::{Incident, detect_incidents};
pub use query::{MonitorDetails, MonitorQueries, MonitorSummary};
pub use stats::{Period, PeriodError, StatsReport, UptimeStats, compute_stats};

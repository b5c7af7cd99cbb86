//! Uptime monitoring engine.
//!
//! Periodically probes HTTP endpoints, keeps per-monitor status and uptime,
//! records every probe in an append-only ping log, alerts owners on up/down
//! transitions and streams updates to live subscribers. The [`analytics`]
//! module answers the dashboard's read-only questions over the same data.

pub mod analytics;
pub mod config;
pub mod database;
pub mod events;
pub mod monitoring;
pub mod notify;
pub mod orchestrator;
pub mod pool;

pub use orchestrator::Engine;

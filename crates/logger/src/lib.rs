//! Shared tracing setup for the uptime binaries.

mod tracing;

pub use self::tracing::{LogFormat, init, init_with_level};

/// Alias kept for the binaries, which call this once at startup.
pub fn init_tracing() {
    init();
}

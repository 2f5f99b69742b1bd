//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

#[cfg(test)]
#[path = "telemetry_test.rs"]
mod tests;

/// Filter used when `RUST_LOG` is unset.
#[must_use]
pub fn default_filter() -> &'static str {
    if cfg!(debug_assertions) { "agency_portal=debug,tower_http=debug,info" } else { "info" }
}

/// Install the global fmt subscriber. Honors `RUST_LOG` when present.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

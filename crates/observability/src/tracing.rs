//! Tracing/logging initialization.
//!
//! Both initializers read `RUST_LOG` and fall back to [`DEFAULT_FILTER`].
//! Only the first successful call installs a subscriber; later calls (from
//! either function) are no-ops.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install JSON logs with timestamps. Returns `true` if this call installed
/// the global subscriber.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Install human-readable logs for local development and tests.
pub fn init_pretty() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init()
        .is_ok()
}

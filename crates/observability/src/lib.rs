//! Tracing and logging setup shared by binaries and tests.

/// Subscriber installation (filters, output format).
pub mod tracing;

pub use crate::tracing::{DEFAULT_FILTER, init, init_pretty};

//! Tracing/logging initialization.
//!
//! Enough for a host embedding the kernel: JSON logs with an env-driven
//! filter, so `RUST_LOG=eventide_pipeline=debug` surfaces pipeline
//! assembly and dispatch without touching code.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

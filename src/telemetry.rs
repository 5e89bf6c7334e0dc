//! Tracing setup shared by tests and any binary embedding this crate.
//!
//! A single `EnvFilter` driven by `RUST_LOG`, defaulting to `info` when
//! unset.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a global `tracing` subscriber. Safe to call more than once;
/// subsequent calls are no-ops (the global default can only be set once
/// per process).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).compact().try_init();
}

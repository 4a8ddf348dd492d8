//! Shared utilities, including logging setup.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// Respects `RUST_LOG`; defaults to `info` when unset. Call once from the
/// binary's `main` before any other work.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

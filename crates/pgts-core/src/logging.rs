//! `tracing` subscriber setup for binaries.
//!
//! Library code only emits events with structured fields (`key`, `method`,
//! `session_id`); choosing the output format is left to the binary.

use tracing_subscriber::EnvFilter;

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Human-readable compact output on stderr.
///
/// `RUST_LOG` wins over `level` when set. Only the first call installs a
/// subscriber.
pub fn init_subscriber(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init();
}

/// One JSON object per event on stderr.
pub fn init_json_subscriber(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_writer(std::io::stderr)
        .json()
        .try_init();
}

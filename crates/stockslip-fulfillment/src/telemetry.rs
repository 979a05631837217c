//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over the configured filter when set.

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// Returns `false` if a subscriber was already installed (tests, embedding
/// applications); the existing one is left in place.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

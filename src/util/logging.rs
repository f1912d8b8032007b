//! Tracing subscriber setup for hosts and tests.
//!
//! The library only emits `tracing` events; installing a subscriber is up
//! to the embedding process. This helper installs a formatted, filtered
//! subscriber the way a standalone host would.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns `false` if a
/// global subscriber was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true));

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

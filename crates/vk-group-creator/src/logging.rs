//! Logging/tracing initialization for the embedding process.
//!
//! The crate itself only emits `tracing` events and `log` records; the
//! process entry point decides where they go. This helper installs a
//! sensible default: `log` records bridged into `tracing`, filtered by
//! `RUST_LOG` (falling back to the given directive), formatted to stderr.

use tracing::subscriber::set_global_default;
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Installs the global subscriber. Safe to call more than once: subsequent
/// calls are no-ops.
pub fn init(default_filter: &str) {
    if LogTracer::init().is_err() {
        // A logger is already installed (tests, embedder-owned setup).
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));
    let _ = set_global_default(subscriber);
}

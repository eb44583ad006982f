//! Diagnostic tracing for the bootstrapper.
//!
//! Operator-facing output (version facts, listings, recovery instructions)
//! is printed to stdout directly and never goes through this module.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber on stderr, compact format.
///
/// `RUST_LOG` wins when set; otherwise `level` (from `--log-level` or
/// `GASCAN_FLAG_LOG_LEVEL`) applies to every target.
///
/// # Example
/// ```bash
/// RUST_LOG=gascan::io=debug gascan --skip-deploy
/// ```
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

//! Test logging.
//!
//! Installs a `tracing-subscriber` formatter filtered by `RUST_LOG`
//! (default `warn`). Safe to call from every test: only the first call
//! installs a subscriber.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the test subscriber if none is installed yet.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // A subscriber installed by an earlier test is fine.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter)
        .try_init();
}

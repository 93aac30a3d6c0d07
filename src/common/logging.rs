//! Logging and tracing configuration
//!
//! The engine only emits `tracing` events; installing a subscriber is left
//! to the binary or test harness driving the run.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::config::LoggingConfig;

/// Initialize tracing on stderr
///
/// Logs are controlled by the `RUST_LOG` environment variable, falling back
/// to `default_filter`. Returns `false` if a global subscriber was already
/// installed, which is expected when several tests call this.
pub fn init(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .is_ok()
}

/// Initialize tracing from the `[logging]` config section
pub fn init_from_config(config: &LoggingConfig) -> bool {
    init(&config.filter)
}

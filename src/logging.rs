//! Tracing subscriber setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable that turns on debug logging.
pub const DEBUG_ENV: &str = "STATEKEEP_DEBUG";

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `debug = true` sets level to DEBUG
/// 2. `RUST_LOG` environment variable
/// 3. Default: INFO
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("statekeep=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("statekeep=info"))
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Whether `STATEKEEP_DEBUG=1` is set.
pub fn debug_from_env() -> bool {
    is_debug_value(std::env::var(DEBUG_ENV).ok().as_deref())
}

fn is_debug_value(value: Option<&str>) -> bool {
    value == Some("1")
}

//! Tracing infrastructure for pixelwire.
//!
//! Enabled by default through the `tracing` feature. With the feature
//! disabled every log macro compiles to nothing.

/// Initialize the tracing subscriber with timestamps.
///
/// Call this at the start of tests or a binary to enable log output.
/// Safe to call more than once; later calls are ignored.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pixelwire=info"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}

#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

// When tracing is enabled, re-export macros from the tracing crate.
#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, error, info, trace, warn};

// When tracing is disabled, every level expands to nothing. Field
// expressions are not evaluated.
#[cfg(not(feature = "tracing"))]
macro_rules! log_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use {
    log_noop as debug, log_noop as error, log_noop as info, log_noop as trace, log_noop as warn,
};

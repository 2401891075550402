//! Log setup for the server binary.

use tracing_subscriber::EnvFilter;

/// The filter used when `RUST_LOG` is not set.
pub fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    })
}

/// Installs the global `fmt` subscriber. Does nothing if one is already
/// installed.
pub fn init_logging(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_target(false)
        .try_init();
}

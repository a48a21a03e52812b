//! Logging setup for the `qrcheck` binary.
//!
//! Verbosity is resolved in this order:
//! 1. `--verbose`: debug for both qrcheck crates
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`, when set
//! 4. info for both qrcheck crates
//!
//! ```rust,no_run
//! use qrcheck::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("suite starting");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "qrcheck=debug,qrcheck_browser=debug";
const QUIET_FILTER: &str = "qrcheck=error,qrcheck_browser=error";
const DEFAULT_FILTER: &str = "qrcheck=info,qrcheck_browser=info";

/// Picks the filter for the given flags. `verbose` wins over `quiet`.
#[must_use]
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Installs the global subscriber. Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Installs the global subscriber with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

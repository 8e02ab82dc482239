//! Structured logging using **tracing**.
//!
//! The library only emits events (`debug!` for cache and stage activity,
//! `warn!` for configuration fallbacks and the blocking-completion switch).
//! Binaries call [`init_structured_logging`] once to get JSON lines on stderr.

use tracing::{error, info, warn};

/// Initializes the global tracing subscriber.
///
/// Call *once* at the beginning of a binary's runtime. Output is JSON on
/// stderr so stdout stays clean for tool output.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering (e.g., `RUST_LOG=cssmod_core=debug`)
pub fn init_structured_logging() {
    // try_init: a host that already installed a subscriber keeps it.
    let _ = tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_current_span(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn log_warn(message: &str) {
    warn!(detail = %message);
}

pub fn log_info(message: &str) {
    info!(detail = %message);
}

pub fn log_error(message: &str) {
    error!(detail = %message);
}

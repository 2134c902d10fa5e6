//! Diagnostic logging for the terminal client.
//!
//! Logs go to stderr so they never interleave with the transcript on stdout.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "CHAT_CLIENT_LOG";

const DEFAULT_LOG_FILTER: &str = "warn";

/// Installs the global subscriber. Safe to call more than once.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        // Fall back to the default filter when the variable is unset or invalid.
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV_VAR)
                .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init();
}

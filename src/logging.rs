//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Level resolution: the `HANGAR_LOG` environment variable when set,
//! otherwise `info` (`--verbose` raises the crate's own spans to debug).

use tracing_subscriber::EnvFilter;

/// Initialise the global subscriber. Call once at startup.
pub fn init(verbose: bool) {
    let fallback = if verbose { "hangar=debug,info" } else { "info" };
    let filter =
        EnvFilter::try_from_env("HANGAR_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

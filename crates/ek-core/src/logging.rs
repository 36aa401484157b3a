//! Logging setup
//!
//! `RUST_LOG` takes precedence; otherwise the level from [`DebugConfig`] applies.

use tracing_subscriber::EnvFilter;

use crate::config::DebugConfig;
use crate::error::EmuError;

/// Install the global fmt subscriber.
///
/// Fails if a global subscriber has already been installed.
pub fn init(config: &DebugConfig) -> Result<(), EmuError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| EmuError::Logging(e.to_string()))
}

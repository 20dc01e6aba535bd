//! Logging initialization and log-file housekeeping.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! [`HarnessConfig`](crate::HarnessConfig). Supports JSON structured
//! logging and human-readable pretty format.

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::GeneralSettings;
use crate::error::HarnessError;

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
///
/// # Formats
///
/// * `"json"` - Machine-parseable JSON lines
/// * `"pretty"` - Human-readable output (default for local runs)
///
/// # Errors
///
/// Returns an error for an unknown format or if a subscriber is
/// already installed.
pub fn init_tracing(config: &GeneralSettings) -> Result<(), HarnessError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .map_err(|e| HarnessError::Config {
                    field: "general.log_format".to_owned(),
                    reason: format!("failed to initialize JSON tracing subscriber: {e}"),
                })?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .map_err(|e| HarnessError::Config {
                    field: "general.log_format".to_owned(),
                    reason: format!("failed to initialize pretty tracing subscriber: {e}"),
                })?;
        }
        other => {
            return Err(HarnessError::Config {
                field: "general.log_format".to_owned(),
                reason: format!("unknown log format '{other}', expected 'json' or 'pretty'"),
            });
        }
    }

    Ok(())
}

/// Remove `*.log` files left behind by a previous run.
///
/// A missing directory is not an error; individual removal failures
/// are logged and skipped.
///
/// # Errors
///
/// Returns an error only if the directory exists but cannot be read.
pub fn clean_previous_logs(dir: impl AsRef<Path>) -> Result<usize, HarnessError> {
    let dir = dir.as_ref();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "log directory absent, nothing to clean");
            return Ok(0);
        }
        Err(e) => {
            return Err(HarnessError::Config {
                field: "general.log_dir".to_owned(),
                reason: format!("{}: {e}", dir.display()),
            });
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "log") {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove log file");
                }
            }
        }
    }

    tracing::info!(dir = %dir.display(), removed = removed, "removed previous log files");
    Ok(removed)
}

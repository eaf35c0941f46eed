//! Shared logging utilities for shelfward hosts.
//!
//! Hosts call [`init_logging`] once at startup. Log lines go to stderr
//! and, unless disabled, to a size-capped file under the app home so
//! wizard sessions can be reconstructed after the fact.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str =
    "shelfward_engine=info,shelfward_query=info,shelfward_cache=info";

/// Keep the previous log around but never more than one generation.
const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Logging configuration shared by shelfward hosts.
pub struct LogConfig<'a> {
    pub app_name: &'a str,

    /// Mirror the full filter to stderr instead of warnings only
    pub verbose: bool,

    /// Skip the file layer entirely (tests, ephemeral tools)
    pub no_file: bool,
}

/// Initialize tracing with a stderr layer and a rotating log file.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        filter
    } else {
        EnvFilter::new("warn")
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file_layer = if config.no_file {
        None
    } else {
        let log_path = rotated_log_path(config.app_name)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;
        let file_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_filter(file_filter),
        )
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();
    Ok(())
}

/// Get the shelfward home directory: `~/.shelfward`, overridable via
/// `SHELFWARD_HOME`.
pub fn shelfward_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("SHELFWARD_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".shelfward")
}

/// Get the logs directory: `~/.shelfward/logs`.
pub fn logs_dir() -> PathBuf {
    shelfward_home().join("logs")
}

/// Default location of the durable cache tier file.
pub fn cache_file() -> PathBuf {
    shelfward_home().join("cache.json")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Current log path for `app_name`, shifting an oversized current file
/// to `<name>.log.old` first.
fn rotated_log_path(app_name: &str) -> Result<PathBuf> {
    let logs = ensure_logs_dir()?;
    let name = sanitize_name(app_name);
    let current = logs.join(format!("{name}.log"));

    let oversized = fs::metadata(&current)
        .map(|m| m.len() > MAX_LOG_FILE_SIZE)
        .unwrap_or(false);
    if oversized {
        let old = logs.join(format!("{name}.log.old"));
        fs::rename(&current, &old)
            .with_context(|| format!("Failed to rotate log file: {}", current.display()))?;
    }
    Ok(current)
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "shelfward".to_string()
    } else {
        cleaned
    }
}

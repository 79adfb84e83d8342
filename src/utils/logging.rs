//! Structured logging setup
//!
//! Builds the global `tracing` subscriber from `logger.yaml`: level and
//! output target come from config, and the `production` environment switches
//! the format to JSON lines for log shippers.

use crate::config::LoggerConfig;
use crate::utils::error::{ProxyError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Returns a guard that must be held for the lifetime of the process when
/// logging to a file; dropping it flushes and stops the background writer.
pub fn init(cfg: &LoggerConfig) -> Result<Option<WorkerGuard>> {
    // tracing has no `fatal` level; the config accepts it for operators
    // coming from zap-style loggers and maps it to `error`.
    let level = match cfg.level.as_str() {
        "fatal" => "error",
        other => other,
    };

    let filter = EnvFilter::try_new(level)
        .map_err(|e| ProxyError::config(format!("invalid log level {:?}: {e}", cfg.level)))?;

    let json = cfg.environment == "production";

    if cfg.output_path.is_empty() || cfg.output_path == "stdout" {
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        if json {
            builder.json().init();
        } else {
            builder.init();
        }
        return Ok(None);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cfg.output_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(Some(guard))
}

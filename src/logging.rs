#![forbid(unsafe_code)]

//! Subscriber setup shared by both binaries: INFO and above on stderr
//! (`RUST_LOG` overrides), plus an optional plain-text log file at the
//! configured level.

use anyhow::{Context, Result, anyhow};

use crate::config::DEFAULT_FILE_LOG_LEVEL;
use std::error::Error;
use std::path::Path;
use tracing::error;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. The returned guard flushes the file
/// writer on drop and must be held until the process exits.
pub fn init_logging(log_file: Option<&Path>, file_level: &str) -> Result<Option<WorkerGuard>> {
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(parse_level(file_level)?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!("installing tracing subscriber: {err}"))?;
    Ok(guard)
}

/// Logs a fatal error raised before the configured subscriber could be
/// installed, falling back to a stderr-only subscriber. An already installed
/// subscriber is reused.
pub fn log_startup_error(err: &(dyn Error + 'static)) {
    let _ = init_logging(None, DEFAULT_FILE_LOG_LEVEL);
    error!("{}", error_chain(err));
}

/// `outer: cause: root cause`
fn error_chain(err: &(dyn Error + 'static)) -> String {
    anyhow::Chain::new(err)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

fn file_writer(path: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("log file {} has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let appender = tracing_appender::rolling::never(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

fn parse_level(level: &str) -> Result<LevelFilter> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| anyhow!("unknown log level '{level}'"))
}

//! Logging setup: console output plus a daily log file.
//!
//! The console shows `info` and above (or `debug` in debug mode); the file
//! under `logging.logDir` always receives `debug` events from Musegen crates.
//! `RUST_LOG` overrides the console filter.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::utils::expand_home;

/// Log files are named `app.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "app";

const FILE_DIRECTIVES: &str = "warn,musegen_core=debug,musegen_providers=debug,musegen_cli=debug";

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Console filter directives for the given mode.
pub fn console_directives(debug: bool) -> &'static str {
    if debug {
        "info,musegen_core=debug,musegen_providers=debug,musegen_cli=debug"
    } else {
        "warn,musegen_core=info,musegen_providers=info,musegen_cli=info"
    }
}

/// Install the global subscriber.
///
/// `verbose` forces debug output on the console regardless of config.
/// Keep the returned guard alive until exit, or buffered file lines are lost.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<WorkerGuard, LoggingError> {
    let debug = config.debug || verbose;

    let log_dir = expand_home(&config.log_dir);
    std::fs::create_dir_all(&log_dir).map_err(|source| LoggingError::CreateDir {
        path: log_dir.clone(),
        source,
    })?;

    let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_directives(debug)));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_filter(EnvFilter::new(FILE_DIRECTIVES));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

use std::path::Path;

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::EnvFilter;

use crate::infra::{config::LogConfig, error::AppError};

const LOG_FILE_PREFIX: &str = "gptini";

/// Routes tracing output to `<logs_dir>/gptini.log`.
///
/// The terminal belongs to the chat screen, so nothing is written to stdout.
/// `RUST_LOG` overrides the configured level. Keep the returned guard alive
/// until shutdown or buffered lines are lost.
pub fn init(config: &LogConfig, logs_dir: &Path) -> Result<WorkerGuard, AppError> {
    let appender = rolling::RollingFileAppender::builder()
        .rotation(rolling::Rotation::NEVER)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(logs_dir)
        .map_err(|error| AppError::LoggingInit(Box::new(error)))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level)),
        )
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(AppError::LoggingInit)?;

    Ok(guard)
}

use crate::error::{AlertError, Result};
use std::fs;
use std::path::Path;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console logging plus a daily-rolling JSON log file named after the job.
///
/// The returned guard flushes the file writer on drop, so keep it alive for the
/// whole run. If the log directory cannot be used, logging stays console-only and
/// there is no guard.
pub fn init_logging(job: &str, log_dir: &Path) -> Option<WorkerGuard> {
    let (file_layer, guard, file_error) = match file_appender(job, log_dir) {
        Ok(appender) => {
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(non_blocking_writer);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    // Binary targets are named after the job with underscores
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("transit_alerts=info,{}=info", job.replace('-', "_")))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    if let Some(e) = file_error {
        warn!("File logging disabled, logging to console only: {}", e);
    }
    guard
}

/// Daily-rolling `{job}.log` appender in `log_dir`, creating the directory if needed.
pub fn file_appender(job: &str, log_dir: &Path) -> Result<RollingFileAppender> {
    fs::create_dir_all(log_dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(format!("{job}.log"))
        .build(log_dir)
        .map_err(|e| {
            AlertError::Config(format!(
                "Cannot open log file in '{}': {}",
                log_dir.display(),
                e
            ))
        })
}

use std::path::Path;

use anyhow::{Context, Result};
use time::macros::format_description;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, fmt, fmt::time::LocalTime, layer::SubscriberExt, util::SubscriberInitExt,
};

const LOG_FILE_PREFIX: &str = "pyload-hub";
const DEFAULT_FILTER: &str = "info,pyload_hub=debug";

/// Log to a daily rotated file in `logs_dir` and to stderr.
///
/// The returned guard flushes the file writer when dropped, so keep it alive
/// for the lifetime of the process.
pub fn setup_logging(logs_dir: &Path) -> Result<WorkerGuard> {
    fs_err::create_dir_all(logs_dir).context("Failed to create logs directory")?;
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(logs_dir)
        .context("Failed to initialize file appender")?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(false) // Disable ANSI colors
                .with_timer(timer.clone())
                .with_writer(non_blocking),
        )
        .with(fmt::layer().compact().with_timer(timer).with_writer(std::io::stderr))
        .try_init()
        .context("Failed to set global subscriber")?;
    Ok(guard)
}

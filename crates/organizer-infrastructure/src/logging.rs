//! Structured logging setup: a `tracing-subscriber` pipeline configured
//! from `LoggingConfig`, with an optional JSON formatter and an optional
//! rotating file appender via `tracing-appender`.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Initialize the global `tracing` subscriber from `config`. Returns a
/// `WorkerGuard` that must be held for the process lifetime when file
/// output is enabled (dropping it flushes and stops the writer thread).
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let stdout_layer: Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> = if config.json_format {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let (file_layer, guard) = match &config.file_output {
        Some(dir) => {
            let appender = tracing_appender::rolling::RollingFileAppender::builder()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .max_log_files(config.max_files)
                .filename_prefix("organizer-core")
                .build(dir)
                .unwrap_or_else(|_| tracing_appender::rolling::daily(dir, "organizer-core"));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to install global tracing subscriber: {error}"))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_a_filter_without_panicking() {
        let config = LoggingConfig::default();
        let _ = EnvFilter::new(&config.level);
    }
}

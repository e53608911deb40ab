use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

// Config logger
#[derive(Debug, Deserialize, Clone)]
struct LoggerConfig {
    logger: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
struct LogConfig {
    level: String,
    output: String,
    format: Option<String>,
    file: Option<LogFileConfig>,
}

#[derive(Debug, Deserialize, Clone)]
struct LogFileConfig {
    path: String,
    rotation_frequency: Option<String>,
}

fn make_writer(
    config: &LogConfig,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    match config.output.as_str() {
        "stdout" => Ok(tracing_appender::non_blocking(std::io::stdout())),
        "stderr" => Ok(tracing_appender::non_blocking(std::io::stderr())),
        "file" => {
            let cfg = config
                .file
                .as_ref()
                .context("file output requires a logger.file section")?;

            let path = Path::new(&cfg.path);
            let directory = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .context("logger.file.path has no file name")?;

            let rotation = match cfg.rotation_frequency.as_deref() {
                Some("minutely") => Rotation::MINUTELY,
                Some("hourly") => Rotation::HOURLY,
                Some("daily") => Rotation::DAILY,
                _ => Rotation::NEVER,
            };

            Ok(tracing_appender::non_blocking(RollingFileAppender::new(
                rotation, directory, file_name,
            )))
        }
        other => Err(anyhow::anyhow!("invalid log output specified: {other}")),
    }
}

/// Initialize the global subscriber from a YAML config. The returned
/// guard must stay alive for buffered log lines to be flushed.
pub fn init_logger(config_path: &str) -> Result<WorkerGuard> {
    let config_content = fs::read_to_string(config_path)
        .context(format!("Failed to read config file: {config_path}"))?;
    let config: LoggerConfig = serde_yaml::from_str(&config_content)
        .context(format!("Failed to parse config file: {config_path}"))?;
    let config = config.logger;

    let (writer, guard) = make_writer(&config)?;

    let env_filter =
        EnvFilter::try_new(&config.level).context("Failed to parse log level from config")?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.format.as_deref() == Some("json") {
        let layer = fmt::layer().with_writer(writer).with_ansi(false).json();
        tracing::subscriber::set_global_default(registry.with(layer))
            .context("Failed to set global default subscriber")?;
    } else {
        let layer = fmt::layer().with_writer(writer).with_ansi(true);
        tracing::subscriber::set_global_default(registry.with(layer))
            .context("Failed to set global default subscriber")?;
    }

    Ok(guard)
}

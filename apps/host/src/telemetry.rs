use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Context;
use teamlink_config::LoggingConfig;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Stdout carries message frames, so logs
/// go to stderr, or to a file when `logging.file` is set.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let subscriber = SubscriberBuilder::default()
                .with_env_filter(env_filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
        }
        None => {
            let subscriber = SubscriberBuilder::default()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
        }
    }
}

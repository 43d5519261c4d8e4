use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

use crate::config::{LogFormat, LoggerSection};

pub(super) struct LoggerConfig {
    pub format: LogFormat,
    pub level: String,
}

impl From<&LoggerSection> for LoggerConfig {
    fn from(value: &LoggerSection) -> Self {
        Self { format: value.format, level: value.level.clone() }
    }
}

pub(super) fn init_logger(config: LoggerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;
    let builder = SubscriberBuilder::default().with_env_filter(filter);

    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    };

    Ok(())
}

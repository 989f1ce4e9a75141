//! Logging service

use crate::models::LogLevel;
use tracing_subscriber::EnvFilter;

fn default_filter(level: &LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "botlink=error,botlink_core=error",
        LogLevel::Warn => "botlink=warn,botlink_core=warn",
        LogLevel::Info => "botlink=info,botlink_core=info",
        LogLevel::Debug => "botlink=debug,botlink_core=debug",
        LogLevel::Trace => "botlink=trace,botlink_core=trace",
    }
}

/// Initialize logging with the specified level. `RUST_LOG` takes precedence when set.
pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()?;

    Ok(())
}

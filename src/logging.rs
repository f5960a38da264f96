use crate::{Error, Result};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Validates that a log level string is valid
pub fn validate_log_level(level: &str) -> Result<LevelFilter> {
    level.parse::<LevelFilter>().map_err(|_| {
        Error::config(format!(
            "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
            level
        ))
    })
}

/// `RUST_LOG` wins over the configured level.
pub fn resolve_log_level(configured: &str) -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| configured.to_string())
}

pub fn init(level: &str) -> Result<()> {
    let fallback = validate_log_level(level)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::default().add_directive(fallback.into())),
        )
        .json()
        .init();

    Ok(())
}

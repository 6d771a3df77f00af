//! Logger setup for the de-identification pipeline

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
#[derive(Debug, Clone)]
pub struct Logger {
    level: String,
}

impl Logger {
    pub fn new() -> Self {
        Self::with_level("info")
    }

    pub fn with_level(level: &str) -> Self {
        Self { level: level.to_string() }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::with_level(&config.level)
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|e| Error::Config(format!("Invalid log level {:?}: {}", self.level, e))),
        }
    }

    /// Fails if the level is invalid or a subscriber is already installed
    pub fn init(&self) -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(self.filter()?)
            .with_target(false)
            .try_init()
            .map_err(|e| Error::Config(format!("Logger already initialized: {}", e)))?;
        info!("Logger initialized with level: {}", self.level);
        Ok(())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_config() {
        let config = LoggingConfig { level: "debug".into() };
        assert_eq!(Logger::from_config(&config).level(), "debug");
        assert_eq!(Logger::default().level(), "info");
    }

    #[test]
    fn test_directive_filter() {
        assert!(Logger::with_level("pdx_deid=trace,warn").filter().is_ok());
    }
}

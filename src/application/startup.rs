//! Immutable startup information shared with every component that needs it

use std::time::{Duration, Instant};

use crate::application::errors::ConfigError;
use crate::domain::entities::ParserConfig;
use crate::infrastructure::config::Config;

#[derive(Debug, Clone)]
pub struct StartupInfo {
    pub bot_name: String,
    pub version: String,
    pub parser: ParserConfig,
    pub started_at: Instant,
}

impl StartupInfo {
    pub fn new(bot_name: impl Into<String>, parser: ParserConfig) -> Self {
        Self {
            bot_name: bot_name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            parser,
            started_at: Instant::now(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(config.bot.name.clone(), config.parser_config()?))
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use crate::application::errors::ConfigError;
use crate::domain::entities::ParserConfig;
use crate::plugins::DuplicatePolicy;

/// Transport the bot runs on, as decided by the config and CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportChoice {
    Telegram { token: String },
    Console,
}

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub logging: LoggingConfig,
    pub session: SessionConfig,
    pub shutdown: ShutdownConfig,
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
    pub case_sensitive: bool,
    pub on_duplicate_command: DuplicatePolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_stem: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SessionConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ShutdownConfig {
    /// How long in-flight handlers may keep running once shutdown starts
    pub grace_period_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AdaptersConfig {
    pub telegram: Option<TelegramConfig>,
    pub console: Option<ConsoleConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TelegramConfig {
    pub enabled: bool,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConsoleConfig {
    pub enabled: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "furina-bot".to_string(),
            prefix: "!".to_string(),
            case_sensitive: false,
            on_duplicate_command: DuplicatePolicy::Override,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_stem: "furina-bot".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("lib/sessions"),
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_period_secs: 5 }
    }
}

impl Default for AdaptersConfig {
    fn default() -> Self {
        Self {
            telegram: Some(TelegramConfig::default()),
            console: Some(ConsoleConfig::default()),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| {
                ConfigError::Parse(format!("Failed to read config {}: {}", path.display(), e))
            })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Environment overrides: `BOT_TOKEN` enables Telegram, `BOT_PREFIX` sets the prefix
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            let tg = self.adapters.telegram.get_or_insert_with(TelegramConfig::default);
            tg.token = Some(token);
            tg.enabled = true;
        }

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            self.bot.prefix = prefix;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.name.trim().is_empty() {
            return Err(ConfigError::MissingField("bot.name".to_string()));
        }
        if self.logging.file_stem.trim().is_empty() {
            return Err(ConfigError::MissingField("logging.file-stem".to_string()));
        }
        self.parser_config().map(|_| ())
    }

    pub fn parser_config(&self) -> Result<ParserConfig, ConfigError> {
        ParserConfig::new(self.bot.prefix.clone(), self.bot.case_sensitive)
    }

    /// Telegram token, if the Telegram adapter is enabled
    pub fn telegram_token(&self) -> Option<String> {
        self.adapters
            .telegram
            .as_ref()
            .filter(|t| t.enabled)
            .and_then(|t| t.token.clone())
    }

    pub fn console_enabled(&self) -> bool {
        self.adapters.console.as_ref().is_some_and(|c| c.enabled)
    }

    /// A token (CLI override first) selects Telegram; otherwise the console
    /// adapter, if it is enabled
    pub fn select_transport(
        &self,
        token_override: Option<String>,
    ) -> Result<TransportChoice, ConfigError> {
        if let Some(token) = token_override.or_else(|| self.telegram_token()) {
            return Ok(TransportChoice::Telegram { token });
        }
        if self.console_enabled() {
            return Ok(TransportChoice::Console);
        }
        Err(ConfigError::MissingField(
            "an enabled transport (adapters.telegram with a token, or adapters.console)"
                .to_string(),
        ))
    }
}

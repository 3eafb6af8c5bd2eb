//! Command parser - Turns raw chat text into structured commands

use crate::domain::entities::{ParsedCommand, ParserConfig};

/// Parses prefixed command text according to a [`ParserConfig`]
#[derive(Debug, Clone, Default)]
pub struct CommandParser {
    config: ParserConfig,
}

impl CommandParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn prefix(&self) -> &str {
        self.config.prefix()
    }

    /// Parse a text message
    pub fn parse(&self, raw: &str) -> ParsedCommand {
        let Some(rest) = raw.trim().strip_prefix(self.config.prefix()) else {
            return ParsedCommand::not_a_command();
        };

        let mut tokens = rest.split_whitespace();
        let Some(name) = tokens.next() else {
            return ParsedCommand::not_a_command();
        };

        let args = tokens.map(str::to_string).collect();
        ParsedCommand::new(self.config.normalize(name), args)
    }

    pub fn is_command(&self, raw: &str) -> bool {
        self.parse(raw).is_command
    }
}

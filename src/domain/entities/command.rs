use crate::application::errors::ConfigError;

/// Prefix and case policy used to recognise commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    prefix: String,
    case_sensitive: bool,
}

impl ParserConfig {
    pub fn new(prefix: impl Into<String>, case_sensitive: bool) -> Result<Self, ConfigError> {
        let prefix = prefix.into();
        if prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "command prefix must not be empty".to_string(),
            ));
        }
        // inbound text is trimmed before matching
        if prefix.starts_with(char::is_whitespace) {
            return Err(ConfigError::InvalidValue(format!(
                "command prefix {:?} must not start with whitespace",
                prefix
            )));
        }
        Ok(Self { prefix, case_sensitive })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Fold a command name into the form used for registry lookups
    pub fn normalize(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            case_sensitive: false,
        }
    }
}

/// Result of parsing one inbound text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
    pub is_command: bool,
}

impl ParsedCommand {
    pub fn not_a_command() -> Self {
        Self::default()
    }

    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
            is_command: true,
        }
    }

    /// Arguments joined back with single spaces
    pub fn rest(&self) -> String {
        self.args.join(" ")
    }
}

/// Static description of a registered handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub name: String,
    pub commands: Vec<String>,
    pub description: String,
}

/// One effective command in the registry, after collisions were resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub command: String,
    pub handler: String,
    pub description: String,
}

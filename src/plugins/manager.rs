//! Plugin manager - owns the command registry

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::errors::ConfigError;
use crate::domain::entities::{CatalogEntry, HandlerDescriptor, ParserConfig};
use crate::plugins::trait_def::Plugin;

/// What to do when a handler claims a command that is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The most recently registered handler takes the command over
    #[default]
    Override,
    /// Registration fails
    Reject,
}

struct Registered {
    plugin: Arc<dyn Plugin>,
    descriptor: HandlerDescriptor,
}

/// Maps command names to exactly one owning handler.
///
/// Registration happens through `&mut self` during startup; once the manager
/// is handed to the dispatcher it is only ever read.
pub struct PluginManager {
    handlers: Vec<Registered>,
    /// normalized command name -> index into `handlers`
    routes: HashMap<String, usize>,
    /// command names in first-registration order
    order: Vec<String>,
    parser: ParserConfig,
    policy: DuplicatePolicy,
}

impl PluginManager {
    pub fn new(parser: ParserConfig, policy: DuplicatePolicy) -> Self {
        Self {
            handlers: Vec::new(),
            routes: HashMap::new(),
            order: Vec::new(),
            parser,
            policy,
        }
    }

    /// Register a plugin under every command it declares
    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) -> Result<(), ConfigError> {
        self.register_arc(Arc::new(plugin))
    }

    pub fn register_arc(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), ConfigError> {
        let name = plugin.name().to_string();
        if name.trim().is_empty() {
            return Err(ConfigError::MissingField("handler name".to_string()));
        }
        if self.handlers.iter().any(|h| h.descriptor.name == name) {
            return Err(ConfigError::DuplicateHandler(name));
        }

        let mut commands: Vec<String> = Vec::new();
        for raw in plugin.commands() {
            if raw.is_empty() || raw.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidValue(format!(
                    "handler '{}' declares an unusable command name {:?}",
                    name, raw
                )));
            }
            let command = self.parser.normalize(raw);
            if !commands.contains(&command) {
                commands.push(command);
            }
        }
        if commands.is_empty() {
            return Err(ConfigError::MissingField(format!("commands for handler '{}'", name)));
        }

        if self.policy == DuplicatePolicy::Reject {
            if let Some((command, existing)) = commands
                .iter()
                .find_map(|c| self.routes.get(c).map(|&idx| (c, idx)))
            {
                return Err(ConfigError::DuplicateCommand {
                    command: command.clone(),
                    existing: self.handlers[existing].descriptor.name.clone(),
                    incoming: name,
                });
            }
        }

        let index = self.handlers.len();
        for command in &commands {
            match self.routes.insert(command.clone(), index) {
                Some(previous) => warn!(
                    "Command '{}' moved from handler '{}' to '{}'",
                    command, self.handlers[previous].descriptor.name, name
                ),
                None => self.order.push(command.clone()),
            }
        }

        info!("Registering handler: {} ({})", name, commands.join(", "));
        let descriptor = HandlerDescriptor {
            name,
            commands,
            description: plugin.description().to_string(),
        };
        self.handlers.push(Registered { plugin, descriptor });
        Ok(())
    }

    /// Find the handler owning an already-normalized command name
    pub fn lookup(&self, command: &str) -> Option<&Arc<dyn Plugin>> {
        self.routes.get(command).map(|&idx| &self.handlers[idx].plugin)
    }

    /// Effective command listing, in first-registration order
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.order
            .iter()
            .filter_map(|command| {
                let owner = &self.handlers[*self.routes.get(command)?].descriptor;
                Some(CatalogEntry {
                    command: command.clone(),
                    handler: owner.name.clone(),
                    description: owner.description.clone(),
                })
            })
            .collect()
    }

    pub fn parser_config(&self) -> &ParserConfig {
        &self.parser
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

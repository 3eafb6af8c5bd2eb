//! Plugin trait definitions

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::errors::{HandlerError, TransportError};
use crate::domain::entities::{CatalogEntry, InboundMessage, ParsedCommand};
use crate::domain::traits::ReplyHandle;

/// Core plugin trait that every command handler implements.
///
/// Handlers are invoked concurrently for unrelated messages, so any state they
/// hold must be read-only once constructed.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique identifier for the handler (not a command name)
    fn name(&self) -> &str;

    /// Command names this handler answers to
    fn commands(&self) -> &[&str];

    /// Human-readable description, shown in help listings
    fn description(&self) -> &str;

    /// Process one command, replying through `ctx` at most once
    async fn handle(&self, ctx: &CommandContext) -> Result<(), HandlerError>;
}

/// Everything a handler gets to see for one command invocation
pub struct CommandContext {
    pub command: ParsedCommand,
    pub prefix: String,
    pub catalog: Arc<[CatalogEntry]>,
    reply: ReplyHandle,
}

impl CommandContext {
    pub fn new(
        command: ParsedCommand,
        prefix: impl Into<String>,
        catalog: Arc<[CatalogEntry]>,
        reply: ReplyHandle,
    ) -> Self {
        Self {
            command,
            prefix: prefix.into(),
            catalog,
            reply,
        }
    }

    pub fn message(&self) -> &InboundMessage {
        self.reply.original()
    }

    pub fn args(&self) -> &[String] {
        &self.command.args
    }

    /// Reply to the triggering message, quoting it
    pub async fn reply(&self, text: impl Into<String>) -> Result<String, TransportError> {
        self.reply.send(text).await
    }
}

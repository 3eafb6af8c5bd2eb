//! Message dispatcher - Routes inbound commands to their owning handler

use std::sync::Arc;

use crate::domain::entities::{CatalogEntry, InboundMessage};
use crate::domain::traits::{ReplyHandle, Transport};
use crate::infrastructure::logging::LogSink;
use crate::plugins::{CommandContext, PluginManager};
use super::parser::CommandParser;

/// Why a message produced no handler call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    FromSelf,
    NoText,
    NotACommand,
    UnknownCommand,
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    Handled { handler: String },
    Failed { handler: String },
    Panicked { handler: String },
}

/// Parses inbound text, finds the owning handler and runs it under supervision
pub struct MessageDispatcher {
    parser: CommandParser,
    plugins: PluginManager,
    catalog: Arc<[CatalogEntry]>,
    transport: Arc<dyn Transport>,
    sink: Arc<LogSink>,
}

impl MessageDispatcher {
    /// Freeze the registry; nothing can be registered after this point
    pub fn new(plugins: PluginManager, transport: Arc<dyn Transport>, sink: Arc<LogSink>) -> Self {
        let parser = CommandParser::new(plugins.parser_config().clone());
        let catalog = plugins.catalog().into();
        Self {
            parser,
            plugins,
            catalog,
            transport,
            sink,
        }
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    /// Route one inbound message. Failures end up in the log sink, never with
    /// the caller.
    pub async fn dispatch(&self, message: InboundMessage) -> DispatchOutcome {
        if message.is_from_self {
            return DispatchOutcome::Ignored(IgnoreReason::FromSelf);
        }
        let Some(text) = message.text_body() else {
            return DispatchOutcome::Ignored(IgnoreReason::NoText);
        };

        let command = self.parser.parse(text);
        if !command.is_command {
            return DispatchOutcome::Ignored(IgnoreReason::NotACommand);
        }

        let Some(plugin) = self.plugins.lookup(&command.name).cloned() else {
            tracing::debug!(
                "Ignoring unknown command '{}' from {}",
                command.name,
                message.sender_id
            );
            return DispatchOutcome::Ignored(IgnoreReason::UnknownCommand);
        };

        let handler = plugin.name().to_string();
        let context = format!("{}/{}", handler, command.name);
        tracing::info!("📨 {} from {} in {}", context, message.sender_id, message.chat_id);

        let reply = ReplyHandle::new(Arc::clone(&self.transport), message);
        let catalog = Arc::clone(&self.catalog);
        let ctx = CommandContext::new(command, self.parser.prefix(), catalog, reply);

        let outcome = self
            .sink
            .supervise(&context, async move { plugin.handle(&ctx).await })
            .await;

        match outcome {
            Some(Ok(())) => DispatchOutcome::Handled { handler },
            Some(Err(e)) => {
                self.sink.log_error(&e, &context);
                DispatchOutcome::Failed { handler }
            }
            None => DispatchOutcome::Panicked { handler },
        }
    }
}

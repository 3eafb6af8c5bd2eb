//! Domain entities - Core business objects with no external dependencies

pub mod command;
pub mod log_entry;
pub mod message;

pub use command::{CatalogEntry, HandlerDescriptor, ParsedCommand, ParserConfig};
pub use log_entry::{LogEntry, LogLevel};
pub use message::{Content, InboundMessage, OutboundReply, QuotedMessage, TransportEvent};

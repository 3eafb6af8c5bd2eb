//! Message handling - Command parsing and dispatching

pub mod dispatcher;
pub mod parser;

pub use dispatcher::{DispatchOutcome, IgnoreReason, MessageDispatcher};
pub use parser::CommandParser;

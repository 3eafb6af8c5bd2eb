//! Application layer errors

use std::path::PathBuf;
use thiserror::Error;

/// Top-level bot errors, used where startup and teardown meet `main`
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and storage-location errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage unavailable at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' is claimed by both '{existing}' and '{incoming}'")]
    DuplicateCommand {
        command: String,
        existing: String,
        incoming: String,
    },

    #[error("Handler '{0}' already registered")]
    DuplicateHandler(String),
}

impl ConfigError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Errors reported by the messaging transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Transport closed")]
    Closed,
}

/// Command handler failures
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Reply failed: {0}")]
    Transport(#[from] TransportError),
}

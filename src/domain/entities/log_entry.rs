use chrono::{DateTime, Local};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Error,
    Panic,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
            LogLevel::Panic => "PANIC",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record in the persistent log
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub context: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            context: context.into(),
            message: message.into(),
        }
    }

    /// `[YYYY-MM-DD HH:MM:SS] LEVEL in CONTEXT: MESSAGE`, newline-terminated.
    /// Embedded line breaks are escaped so an entry always stays on one line.
    pub fn to_line(&self) -> String {
        format!(
            "[{}] {} in {}: {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            single_line(&self.context),
            single_line(&self.message),
        )
    }
}

fn single_line(s: &str) -> String {
    s.replace('\r', "\\r").replace('\n', "\\n")
}

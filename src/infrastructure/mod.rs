//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Logging: the persistent log sink
//! - Storage: session directory persistence
//! - Adapters: Platform integrations (console, Telegram)

pub mod adapters;
pub mod config;
pub mod logging;
pub mod storage;

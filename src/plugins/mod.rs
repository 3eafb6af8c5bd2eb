//! Command handler plugins for furina-bot
//! 
//! Provides the handler contract, the registry that owns command names and
//! the baseline handlers

pub mod general;
pub mod manager;
pub mod trait_def;

pub use manager::{DuplicatePolicy, PluginManager};
pub use trait_def::{CommandContext, Plugin};

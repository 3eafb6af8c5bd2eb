//! furina-bot - a chat-command bot with a failure-isolating dispatch core

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;

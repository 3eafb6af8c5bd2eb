//! Baseline command handlers

pub mod menu;
pub mod ping;

pub use menu::MenuPlugin;
pub use ping::PingPlugin;

//! Application services - Event loop orchestration

pub mod event_service;

pub use event_service::{EventRouter, LoopExit};

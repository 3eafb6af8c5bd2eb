//! Domain layer - Core business objects and the abstractions around them
//! 
//! This layer contains:
//! - Entities: inbound messages, replies, commands, log entries
//! - Traits: the transport seam and the reply capability

pub mod entities;
pub mod traits;

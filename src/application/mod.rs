//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Errors: the error taxonomy shared across layers
//! - Messaging: command parsing and dispatching
//! - Services: the event loop
//! - Startup: immutable startup information

pub mod errors;
pub mod messaging;
pub mod services;
pub mod startup;

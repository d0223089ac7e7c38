//! Shared types for the fleet chaos harness
//!
//! Contains the actor identity attached to every log record, log level
//! parsing, tracing initialisation and the shared error type.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;

// Re-exported so the `actor_*!` macros resolve for every caller
pub use tracing;

//! Tally Core Library
//!
//! Shared domain model for the counter application: the counter itself, the
//! command vocabulary that mutates it, and the JSON payload types the web
//! app and the e2e harness exchange.

pub mod command;
pub mod counter;
pub mod types;

// Re-export commonly used types
pub use command::Command;
pub use counter::Counter;
pub use types::{CommandOutcome, CounterSnapshot};

/// Tally version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

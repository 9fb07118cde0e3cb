//! Tally Web App
//!
//! The UI surface that owns the counter for the lifetime of the process:
//! serves the counter page at the root and the small JSON API the page (and
//! the e2e harness) talk to. State never outlives the process; every run
//! starts a fresh session at zero.

pub mod page;
pub mod server;

pub use server::{WebServer, WebServerConfig};

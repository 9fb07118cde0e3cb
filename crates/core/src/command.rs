//! Commands that mutate the counter

use serde::{Deserialize, Serialize};

/// The two activations a control can deliver.
///
/// Every mutation of the counter goes through one of these; there is no
/// other write path. Both are nullary and total, so there is nothing to
/// validate and nothing to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Increment,
    Decrement,
}

impl Command {
    /// Route suffix used by the web API (`POST /api/counter/<suffix>`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Increment => "increment",
            Command::Decrement => "decrement",
        }
    }
}

//! Wire payloads shared by the web app and the harness

use serde::{Deserialize, Serialize};

use crate::command::Command;

/// Counter state as reported by `GET /api/counter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub value: u64,
}

/// Response of the command endpoints: which command was applied and the
/// value after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub command: Command,
    pub value: u64,
}

//! Counter state machine

use std::fmt;

use tracing::debug;

use crate::command::Command;

/// A non-negative counter with a floor of zero.
///
/// The value moves only through [`Counter::apply`] or the two named
/// operations it dispatches to. Decrementing at zero is a state no-op, so
/// the value can never go negative; incrementing saturates at the
/// representation limit, which no activation sequence reaches in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    value: u64,
}

impl Counter {
    /// Create a counter starting at `initial_value`.
    pub fn new(initial_value: u64) -> Self {
        Self {
            value: initial_value,
        }
    }

    /// Current value.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Add one, returning the new value.
    pub fn increment(&mut self) -> u64 {
        self.value = self.value.saturating_add(1);
        debug!(value = self.value, "counter incremented");
        self.value
    }

    /// Subtract one, clamped at zero, returning the new value.
    pub fn decrement(&mut self) -> u64 {
        self.value = self.value.saturating_sub(1);
        debug!(value = self.value, "counter decremented");
        self.value
    }

    /// Apply a command, returning the new value.
    pub fn apply(&mut self, command: Command) -> u64 {
        match command {
            Command::Increment => self.increment(),
            Command::Decrement => self.decrement(),
        }
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Display for Counter {
    /// Renders the plain decimal digits, nothing else. The page's display
    /// element shows exactly this text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

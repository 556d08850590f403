use serde::{Deserialize, Serialize};

/// What an engine did with a caller's request.
///
/// None of these are errors: a presentation layer may race the engine and
/// submit while a choreography is still running.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The request changed state.
    Accepted,
    /// Empty or whitespace-only content; nothing changed.
    Ignored,
    /// Not allowed in the current state (wrong turn, reply in flight, ...).
    Rejected,
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted)
    }
}

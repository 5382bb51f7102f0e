use serde::{Deserialize, Serialize};

use super::Dice;

/// Round phases
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Stakes are accepted until the deadline
    #[default]
    Selecting,
    /// Dice have been rolled and stakes settled; results are visible
    Resolving,
}

impl Phase {
    /// The phase that follows this one; the cycle has no terminal state.
    pub fn next(self) -> Self {
        match self {
            Phase::Selecting => Phase::Resolving,
            Phase::Resolving => Phase::Selecting,
        }
    }
}

/// A past roll, as kept in the bounded history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub dice: Dice,
}

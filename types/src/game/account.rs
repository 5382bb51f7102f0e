use serde::{Deserialize, Serialize};

use super::{DEFAULT_NICKNAME, STARTING_SCORE};

/// Player account as held by the account store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub uid: String,
    /// Empty when the document has none; the ranking then shows a uid prefix.
    #[serde(default)]
    pub nickname: String,
    /// Current balance. Kept non-negative by the staking check, not by the type.
    #[serde(default)]
    pub score: i64,
    /// Rounds participated in, win or lose
    #[serde(default)]
    pub plays: u64,
    /// Largest single-round gain ever achieved
    #[serde(default)]
    pub max_record: i64,
    /// Round id of the last free bonus grant (0 = never)
    #[serde(default)]
    pub last_claim_round: u64,
}

impl Account {
    pub fn new(uid: impl Into<String>) -> Self {
        Self::with_nickname(uid, DEFAULT_NICKNAME)
    }

    pub fn with_nickname(uid: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            nickname: nickname.into(),
            score: STARTING_SCORE,
            plays: 0,
            max_record: 0,
            last_claim_round: 0,
        }
    }

    /// Applies the outcome of one settled round.
    ///
    /// `gained` is the total returned to the player (principal plus winnings).
    pub fn apply_round_result(&mut self, gained: i64, is_win: bool) {
        self.plays = self.plays.saturating_add(1);
        if is_win {
            self.score = self.score.saturating_add(gained);
            self.max_record = self.max_record.max(gained);
        }
    }
}

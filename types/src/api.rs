//! Request and response bodies exchanged with the HTTP layer.

use crate::{Dice, HistoryEntry, Outcome, Phase, RankingEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of the table as seen by one caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub state: Phase,
    pub round_id: u64,
    /// Whole seconds left in the current phase, rounded up
    pub timer: u64,
    pub remaining_ms: u64,
    /// `[0, 0, 0]` while selecting
    pub dice: Dice,
    /// 0 while selecting
    pub sum: u8,
    /// Empty while selecting
    pub outcomes: Vec<Outcome>,
    pub history: Vec<HistoryEntry>,
    pub score: i64,
    pub nickname: String,
    pub my_selections: BTreeMap<Outcome, i64>,
    /// Net change from the last settled round (gained minus staked)
    pub round_result: i64,
    pub bonus_claimed: bool,
    pub ranking: Vec<RankingEntry>,
    /// Deprecated: same as `score`, kept for older clients
    pub balance: i64,
    /// Deprecated: same as `my_selections`, kept for older clients
    pub my_bets: BTreeMap<Outcome, i64>,
}

/// Stake request. The legacy field names are still accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRequest {
    #[serde(alias = "bet_type")]
    pub prediction_type: String,
    #[serde(alias = "amount")]
    pub points: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicknameRequest {
    pub nickname: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub uid: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub uid: String,
}

/// Generic success/failure acknowledgement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            success: true,
            msg: None,
        }
    }

    pub fn ok_with(msg: impl Into<String>) -> Self {
        Self {
            success: true,
            msg: Some(msg.into()),
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg: Some(msg.into()),
        }
    }
}

/// Balance after a successful bonus claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub success: bool,
    pub score: i64,
    pub round_id: u64,
}

/// Service usage notice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub is_entertainment_only: bool,
    pub no_cashout: bool,
    pub no_transfer: bool,
    pub message: String,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            is_entertainment_only: true,
            no_cashout: true,
            no_transfer: true,
            message: "This service is a game for entertainment only. Points have no cash value \
                      and cannot be exchanged, transferred, or traded."
                .to_string(),
        }
    }
}

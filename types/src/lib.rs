//! Common types used throughout tripledice.

pub mod api;
pub mod game;

pub use game::{
    Account, Dice, HistoryEntry, Outcome, ParseOutcomeError, Phase, Ranking, RankingEntry,
};

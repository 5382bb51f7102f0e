//! Round engine for tripledice.
//!
//! A round cycles between a selection window, where players stake points on outcome tags of
//! the next three-dice roll, and a result window, where the roll is shown after every stake has
//! been settled. The [Engine] owns all mutable game state and is meant to live behind a single
//! lock; every operation takes the current instant explicitly so the caller controls time.

pub mod engine;
pub mod ledger;
pub mod outcome;
pub mod payout;
pub mod rng;
pub mod round;
pub mod settlement;
pub mod store;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod integration_tests;

pub use engine::Engine;
pub use ledger::{Ledger, Stakes};
pub use outcome::{derive, Roll};
pub use rng::{GameRng, Roller};
pub use round::{Round, Timing};
pub use settlement::{settle, Settlement};
pub use store::{AccountStore, Memory, Remote, RetryPolicy, StoreError};

use thiserror::Error;

/// Reasons an operation on the table can fail. None of them are fatal to the process.
#[derive(Error, Debug)]
pub enum Error {
    #[error("login required")]
    Unauthenticated,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("the selection window is closed")]
    PhaseRejected,
    #[error("insufficient balance: have {balance}, need {requested}")]
    InsufficientBalance { balance: i64, requested: i64 },
    #[error("bonus already claimed this round")]
    AlreadyClaimed,
    #[error("balance {balance} is too high to claim the bonus")]
    BalanceTooHighToClaim { balance: i64 },
    #[error("account store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

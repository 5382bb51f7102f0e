//! Persistence of player accounts.
//!
//! The engine only needs a small per-document contract, so the backend (an in-process map or a
//! remote document store) is chosen when the engine is constructed.

mod memory;
mod remote;

pub use memory::Memory;
pub use remote::{Remote, RetryPolicy};

use std::future::Future;
use thiserror::Error;
use tripledice_types::Account;

/// Error type for account store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {0}")]
    Failed(reqwest::StatusCode),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Account persistence used by the engine. Every operation is keyed by a single uid.
pub trait AccountStore: Send + Sync {
    /// Returns the account if it exists.
    fn get(&self, uid: &str) -> impl Future<Output = Result<Option<Account>, StoreError>> + Send;

    /// Returns the account, creating it with default values first if needed.
    fn get_or_create(
        &mut self,
        uid: &str,
    ) -> impl Future<Output = Result<Account, StoreError>> + Send;

    /// Unconditionally subtract `amount` from the balance.
    fn debit(&mut self, uid: &str, amount: i64)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Unconditionally add `amount` to the balance.
    fn credit(
        &mut self,
        uid: &str,
        amount: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Record one settled round: plays always increments; on a win the balance grows by
    /// `gained` and the record ratchets up.
    fn apply_round_result(
        &mut self,
        uid: &str,
        gained: i64,
        is_win: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Credit a free bonus and remember the round it was granted in.
    fn claim_bonus(
        &mut self,
        uid: &str,
        round_id: u64,
        amount: i64,
    ) -> impl Future<Output = Result<Account, StoreError>> + Send;

    /// Rename the account, creating it with this nickname if absent.
    fn set_nickname(
        &mut self,
        uid: &str,
        nickname: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Every known account.
    fn list_accounts(&self) -> impl Future<Output = Result<Vec<Account>, StoreError>> + Send;
}

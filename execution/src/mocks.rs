//! Test doubles for the dice source and the account store.

use crate::{
    store::{AccountStore, Memory, StoreError},
    Roller,
};
use std::collections::{HashSet, VecDeque};
use tripledice_types::{Account, Dice};

/// Rolls a scripted sequence of dice, then repeats the last one.
#[derive(Clone, Debug)]
pub struct LoadedDice {
    queue: VecDeque<Dice>,
    last: Dice,
}

impl LoadedDice {
    pub fn new(rolls: impl IntoIterator<Item = Dice>) -> Self {
        Self {
            queue: rolls.into_iter().collect(),
            last: [1, 2, 3],
        }
    }

    /// Always rolls `dice`.
    pub fn always(dice: Dice) -> Self {
        Self {
            queue: VecDeque::new(),
            last: dice,
        }
    }
}

impl Roller for LoadedDice {
    fn roll(&mut self) -> Dice {
        if let Some(dice) = self.queue.pop_front() {
            self.last = dice;
        }
        self.last
    }
}

/// In-memory store that can be told to fail.
///
/// `down` fails every call; `failing` fails round results for the listed uids only.
#[derive(Clone, Debug, Default)]
pub struct Flaky {
    pub inner: Memory,
    pub down: bool,
    pub failing: HashSet<String>,
}

impl Flaky {
    pub fn new(inner: Memory) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down {
            return Err(StoreError::Unavailable("store is down".to_string()));
        }
        Ok(())
    }
}

impl AccountStore for Flaky {
    async fn get(&self, uid: &str) -> Result<Option<Account>, StoreError> {
        self.check()?;
        self.inner.get(uid).await
    }

    async fn get_or_create(&mut self, uid: &str) -> Result<Account, StoreError> {
        self.check()?;
        self.inner.get_or_create(uid).await
    }

    async fn debit(&mut self, uid: &str, amount: i64) -> Result<(), StoreError> {
        self.check()?;
        self.inner.debit(uid, amount).await
    }

    async fn credit(&mut self, uid: &str, amount: i64) -> Result<(), StoreError> {
        self.check()?;
        self.inner.credit(uid, amount).await
    }

    async fn apply_round_result(
        &mut self,
        uid: &str,
        gained: i64,
        is_win: bool,
    ) -> Result<(), StoreError> {
        self.check()?;
        if self.failing.contains(uid) {
            return Err(StoreError::Unavailable(format!("write for {uid} failed")));
        }
        self.inner.apply_round_result(uid, gained, is_win).await
    }

    async fn claim_bonus(
        &mut self,
        uid: &str,
        round_id: u64,
        amount: i64,
    ) -> Result<Account, StoreError> {
        self.check()?;
        self.inner.claim_bonus(uid, round_id, amount).await
    }

    async fn set_nickname(&mut self, uid: &str, nickname: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set_nickname(uid, nickname).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.check()?;
        self.inner.list_accounts().await
    }
}

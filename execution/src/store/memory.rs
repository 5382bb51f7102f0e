use super::{AccountStore, StoreError};
use std::collections::HashMap;
use tripledice_types::Account;

/// In-process account store.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    accounts: HashMap<String, Account>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a few accounts so a fresh table has a ranking to show.
    pub fn with_demo_accounts() -> Self {
        let mut store = Self::new();
        for (uid, nickname, score, plays, max_record) in [
            ("Rich_Bot", "RichGuy", 5_000_000, 100, 50_000),
            ("Lucky_Bot", "Lucky77", 2_500_000, 50, 150_000),
            ("Newbie_Bot", "Newbie", 100_000, 10, 5_000),
        ] {
            store.insert(Account {
                plays,
                max_record,
                score,
                ..Account::with_nickname(uid, nickname)
            });
        }
        store
    }

    pub fn insert(&mut self, account: Account) {
        self.accounts.insert(account.uid.clone(), account);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn entry(&mut self, uid: &str) -> &mut Account {
        self.accounts
            .entry(uid.to_string())
            .or_insert_with(|| Account::new(uid))
    }
}

impl AccountStore for Memory {
    async fn get(&self, uid: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(uid).cloned())
    }

    async fn get_or_create(&mut self, uid: &str) -> Result<Account, StoreError> {
        Ok(self.entry(uid).clone())
    }

    async fn debit(&mut self, uid: &str, amount: i64) -> Result<(), StoreError> {
        let account = self.entry(uid);
        account.score = account.score.saturating_sub(amount);
        Ok(())
    }

    async fn credit(&mut self, uid: &str, amount: i64) -> Result<(), StoreError> {
        let account = self.entry(uid);
        account.score = account.score.saturating_add(amount);
        Ok(())
    }

    async fn apply_round_result(
        &mut self,
        uid: &str,
        gained: i64,
        is_win: bool,
    ) -> Result<(), StoreError> {
        self.entry(uid).apply_round_result(gained, is_win);
        Ok(())
    }

    async fn claim_bonus(
        &mut self,
        uid: &str,
        round_id: u64,
        amount: i64,
    ) -> Result<Account, StoreError> {
        let account = self.entry(uid);
        account.score = account.score.saturating_add(amount);
        account.last_claim_round = round_id;
        Ok(account.clone())
    }

    async fn set_nickname(&mut self, uid: &str, nickname: &str) -> Result<(), StoreError> {
        match self.accounts.get_mut(uid) {
            Some(account) => account.nickname = nickname.to_string(),
            None => self.insert(Account::with_nickname(uid, nickname)),
        }
        Ok(())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.accounts.values().cloned().collect())
    }
}

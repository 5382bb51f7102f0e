use serde::{Deserialize, Serialize};

use super::{Account, RANKING_SIZE, UID_PREFIX_LENGTH};

/// Ranking entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub nickname: String,
    pub score: i64,
    pub plays: u64,
}

/// Top accounts by score, highest first.
///
/// A snapshot is always rebuilt from scratch; it is never patched in place.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ranking {
    pub entries: Vec<RankingEntry>,
}

impl Ranking {
    pub fn compute<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Self {
        let mut accounts: Vec<&Account> = accounts.into_iter().collect();

        // Ties broken by uid so equal scores always rank the same way
        accounts.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.uid.cmp(&b.uid)));

        let entries = accounts
            .into_iter()
            .take(RANKING_SIZE)
            .map(|account| RankingEntry {
                nickname: display_name(account),
                score: account.score,
                plays: account.plays,
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn display_name(account: &Account) -> String {
    if account.nickname.is_empty() {
        account.uid.chars().take(UID_PREFIX_LENGTH).collect()
    } else {
        account.nickname.clone()
    }
}

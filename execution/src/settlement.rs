//! Settlement of a round's ledger against the rolled outcome.

use crate::{ledger::Ledger, outcome::Roll, payout::stake_return, Stakes};
use std::collections::BTreeMap;

/// Result of settling one player's stakes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Settlement {
    /// Total staked this round (already debited)
    pub used: i64,
    /// Total returned: principal plus winnings of every winning stake
    pub gained: i64,
}

impl Settlement {
    /// Net change to the balance across the whole round.
    pub fn net(&self) -> i64 {
        self.gained.saturating_sub(self.used)
    }

    pub fn is_win(&self) -> bool {
        self.gained > 0
    }
}

/// Settle a single player's stakes. Losing stakes contribute nothing: they were lost when
/// they were debited.
pub fn settle_stakes(stakes: &Stakes, roll: &Roll) -> Settlement {
    stakes
        .iter()
        .fold(Settlement::default(), |acc, (&outcome, &stake)| Settlement {
            used: acc.used.saturating_add(stake),
            gained: acc
                .gained
                .saturating_add(stake_return(outcome, stake, roll)),
        })
}

/// Settle every player in the ledger. Pure: identical inputs give identical results.
pub fn settle(ledger: &Ledger, roll: &Roll) -> BTreeMap<String, Settlement> {
    ledger
        .iter()
        .map(|(uid, stakes)| (uid.clone(), settle_stakes(stakes, roll)))
        .collect()
}

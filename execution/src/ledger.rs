//! Stakes placed during the current round.

use std::collections::BTreeMap;
use tripledice_types::Outcome;

/// One player's stakes for the round, keyed by outcome.
pub type Stakes = BTreeMap<Outcome, i64>;

/// Per-round prediction ledger.
///
/// Every entry corresponds to points already debited from the player's balance. Players are
/// kept in uid order so settlement visits them deterministically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    stakes: BTreeMap<String, Stakes>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `points` to the player's stake on `outcome` (additive within a round).
    pub fn stake(&mut self, uid: &str, outcome: Outcome, points: i64) {
        let stake = self
            .stakes
            .entry(uid.to_string())
            .or_default()
            .entry(outcome)
            .or_insert(0);
        *stake = stake.saturating_add(points);
    }

    pub fn get(&self, uid: &str) -> Option<&Stakes> {
        self.stakes.get(uid)
    }

    /// Sum of everything the player has staked this round.
    pub fn total(&self, uid: &str) -> i64 {
        self.stakes
            .get(uid)
            .map(|stakes| stakes.values().fold(0i64, |acc, v| acc.saturating_add(*v)))
            .unwrap_or(0)
    }

    pub fn remove(&mut self, uid: &str) -> Option<Stakes> {
        self.stakes.remove(uid)
    }

    pub fn clear(&mut self) {
        self.stakes.clear();
    }

    pub fn len(&self) -> usize {
        self.stakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stakes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Stakes)> {
        self.stakes.iter()
    }
}

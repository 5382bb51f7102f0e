use crate::{
    ledger::Ledger,
    outcome::derive,
    payout::max_return,
    rng::{GameRng, Roller},
    round::{Round, Timing},
    settlement::settle,
    store::AccountStore,
    Error, Result,
};
use std::{
    collections::{BTreeMap, VecDeque},
    time::Instant,
};
use tracing::{debug, info, warn};
use tripledice_types::{
    api::Status,
    game::{BONUS_AMOUNT, BONUS_BALANCE_CEILING, DEFAULT_NICKNAME, HISTORY_CAPACITY},
    Account, HistoryEntry, Outcome, Phase, Ranking,
};

/// All mutable state of the table.
///
/// The engine is not synchronized itself: callers hold it behind one lock and every method
/// runs as a single critical section. Each mutating operation first performs the deadline
/// check itself, so it never acts on a phase that has already ended.
pub struct Engine<S: AccountStore, R: Roller = GameRng> {
    store: S,
    roller: R,
    timing: Timing,

    round: Round,
    ledger: Ledger,
    /// Net result of the last settled round, per participant
    results: BTreeMap<String, i64>,
    history: VecDeque<HistoryEntry>,
    ranking: Ranking,
}

impl<S: AccountStore, R: Roller> Engine<S, R> {
    pub async fn new(store: S, roller: R, timing: Timing, now: Instant) -> Self {
        let mut engine = Self {
            store,
            roller,
            round: Round::new(&timing, now),
            timing,
            ledger: Ledger::new(),
            results: BTreeMap::new(),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            ranking: Ranking::default(),
        };
        engine.refresh_ranking().await;
        engine
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Past rolls, most recent first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn ranking(&self) -> &Ranking {
        &self.ranking
    }

    /// Net result of the last settled round for `uid` (0 if it did not take part).
    pub fn last_result(&self, uid: &str) -> i64 {
        self.results.get(uid).copied().unwrap_or(0)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Advance one phase if the current deadline has elapsed.
    ///
    /// Idempotent for a given deadline: the new deadline is always in the future relative to
    /// `now`, so a repeated call with the same `now` does nothing. Returns the new phase when
    /// a transition happened.
    pub async fn advance_if_due(&mut self, now: Instant) -> Option<Phase> {
        if !self.round.is_due(now) {
            return None;
        }
        match self.round.phase() {
            Phase::Selecting => self.resolve(now).await,
            Phase::Resolving => self.open_next_round(now),
        }
        Some(self.round.phase())
    }

    /// Selecting -> Resolving: roll, settle every stake, refresh the ranking, record history.
    async fn resolve(&mut self, now: Instant) {
        let round_id = self.round.round_id();
        let roll = derive(self.roller.roll());

        // Settle against the ledger as it stands; it is only cleared when the next round opens
        let settlements = settle(&self.ledger, &roll);
        for (uid, settlement) in &settlements {
            self.results.insert(uid.clone(), settlement.net());
            if let Err(e) = self
                .store
                .apply_round_result(uid, settlement.gained, settlement.is_win())
                .await
            {
                warn!(
                    round_id,
                    uid = %uid,
                    gained = settlement.gained,
                    error = %e,
                    "failed to record round result"
                );
            }
        }

        self.refresh_ranking().await;

        self.history.push_front(HistoryEntry { dice: roll.dice });
        self.history.truncate(HISTORY_CAPACITY);

        info!(
            round_id,
            dice = ?roll.dice,
            sum = roll.sum,
            participants = settlements.len(),
            "round resolved"
        );
        self.round.begin_resolving(roll, &self.timing, now);
    }

    /// Resolving -> Selecting: next round id, empty ledger.
    fn open_next_round(&mut self, now: Instant) {
        self.round.begin_selecting(&self.timing, now);
        self.ledger.clear();
        self.results.clear();
        debug!(round_id = self.round.round_id(), "selection open");
    }

    /// Rebuild the ranking snapshot from every known account. On failure the previous snapshot
    /// is kept.
    pub async fn refresh_ranking(&mut self) {
        match self.store.list_accounts().await {
            Ok(accounts) => self.ranking = Ranking::compute(&accounts),
            Err(e) => warn!(error = %e, "failed to refresh ranking"),
        }
    }

    /// Stake `points` on `outcome` for the current round. Returns the balance after the debit.
    pub async fn stake(
        &mut self,
        uid: &str,
        outcome: Outcome,
        points: i64,
        now: Instant,
    ) -> Result<i64> {
        self.advance_if_due(now).await;
        if self.round.phase() != Phase::Selecting {
            return Err(Error::PhaseRejected);
        }
        if points <= 0 {
            return Err(Error::InvalidInput(format!("points must be positive, got {points}")));
        }

        let account = self.store.get_or_create(uid).await?;
        if account.score < points {
            return Err(Error::InsufficientBalance {
                balance: account.score,
                requested: points,
            });
        }

        if self.exposure(uid, outcome, points, account.score - points).is_none() {
            return Err(Error::InvalidInput(format!(
                "stake of {points} could pay out more than a balance can hold"
            )));
        }

        // Escrow: the ledger entry only exists once the debit has gone through
        self.store.debit(uid, points).await?;
        self.ledger.stake(uid, outcome, points);
        debug!(uid, %outcome, points, "stake placed");
        Ok(account.score - points)
    }

    /// Balance `uid` would reach if every stake, including `points` more on `outcome`, paid
    /// out at the largest multiplier. `None` if that does not fit in an `i64`.
    fn exposure(&self, uid: &str, outcome: Outcome, points: i64, balance: i64) -> Option<i64> {
        let mut stakes = self.ledger.get(uid).cloned().unwrap_or_default();
        let stake = stakes.entry(outcome).or_insert(0);
        *stake = stake.checked_add(points)?;
        stakes
            .values()
            .try_fold(balance, |acc, &stake| acc.checked_add(max_return(stake)?))
    }

    /// Refund every stake `uid` placed this round. Returns the amount refunded.
    pub async fn cancel_stakes(&mut self, uid: &str, now: Instant) -> Result<i64> {
        self.advance_if_due(now).await;
        if self.round.phase() != Phase::Selecting {
            return Err(Error::PhaseRejected);
        }

        let refund = self.ledger.total(uid);
        if refund == 0 {
            return Ok(0);
        }
        self.store.credit(uid, refund).await?;
        self.ledger.remove(uid);
        debug!(uid, refund, "stakes cancelled");
        Ok(refund)
    }

    /// Grant the free bonus: at most once per round, only to nearly empty accounts.
    pub async fn claim_bonus(&mut self, uid: &str, now: Instant) -> Result<Account> {
        self.advance_if_due(now).await;
        let round_id = self.round.round_id();

        let account = self.store.get_or_create(uid).await?;
        if account.last_claim_round == round_id {
            return Err(Error::AlreadyClaimed);
        }
        if account.score > BONUS_BALANCE_CEILING {
            return Err(Error::BalanceTooHighToClaim {
                balance: account.score,
            });
        }

        let account = self.store.claim_bonus(uid, round_id, BONUS_AMOUNT).await?;
        info!(uid, round_id, score = account.score, "bonus claimed");
        Ok(account)
    }

    /// Rename `uid` (creating the account if needed) and refresh the ranking.
    ///
    /// The nickname is expected to be validated already.
    pub async fn set_nickname(&mut self, uid: &str, nickname: &str, now: Instant) -> Result<()> {
        self.advance_if_due(now).await;
        self.store.set_nickname(uid, nickname).await?;
        self.refresh_ranking().await;
        Ok(())
    }

    /// Snapshot of the table for `uid` (or for an anonymous viewer).
    ///
    /// Dice, sum and outcomes are only filled in while the roll is being shown.
    pub async fn status(&mut self, uid: Option<&str>, now: Instant) -> Result<Status> {
        self.advance_if_due(now).await;
        let round_id = self.round.round_id();
        let remaining = self.round.remaining(now);

        let (dice, sum, outcomes) = match self.round.visible_roll() {
            Some(roll) => (roll.dice, roll.sum, roll.outcomes.iter().copied().collect()),
            None => ([0; 3], 0, Vec::new()),
        };

        let (score, nickname, my_selections, round_result, bonus_claimed) = match uid {
            Some(uid) => {
                let account = self.store.get_or_create(uid).await?;
                (
                    account.score,
                    account.nickname,
                    self.ledger.get(uid).cloned().unwrap_or_default(),
                    self.last_result(uid),
                    account.last_claim_round == round_id,
                )
            }
            None => (
                0,
                DEFAULT_NICKNAME.to_string(),
                BTreeMap::new(),
                0,
                false,
            ),
        };

        let remaining_ms = remaining.as_millis() as u64;
        Ok(Status {
            state: self.round.phase(),
            round_id,
            timer: remaining_ms.div_ceil(1000),
            remaining_ms,
            dice,
            sum,
            outcomes,
            history: self.history.iter().copied().collect(),
            score,
            nickname,
            my_bets: my_selections.clone(),
            my_selections,
            round_result,
            bonus_claimed,
            ranking: self.ranking.entries.clone(),
            balance: score,
        })
    }
}

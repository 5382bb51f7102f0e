//! Integration tests for the round engine.
//!
//! These tests drive full selection/resolution cycles through the engine with scripted dice
//! and explicit timestamps.

use crate::{
    mocks::{Flaky, LoadedDice},
    store::{AccountStore, Memory},
    Engine, Error, Timing,
};
use std::time::{Duration, Instant};
use tripledice_types::{
    game::{BONUS_AMOUNT, HISTORY_CAPACITY, STARTING_SCORE},
    Account, Outcome, Phase,
};

const SELECTING: Duration = Duration::from_secs(15);
const RESOLVING: Duration = Duration::from_secs(5);

async fn create_engine<S: AccountStore>(
    store: S,
    dice: LoadedDice,
) -> (Engine<S, LoadedDice>, Instant) {
    let start = Instant::now();
    let engine = Engine::new(store, dice, Timing::default(), start).await;
    (engine, start)
}

async fn balance<S: AccountStore>(engine: &Engine<S, LoadedDice>, uid: &str) -> i64 {
    engine.store().get(uid).await.unwrap().unwrap().score
}

async fn account<S: AccountStore>(engine: &Engine<S, LoadedDice>, uid: &str) -> Account {
    engine.store().get(uid).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_winning_round() {
    let (mut engine, start) = create_engine(Memory::new(), LoadedDice::always([3, 3, 3])).await;

    let left = engine
        .stake("alice", Outcome::Triple(3), 100, start)
        .await
        .unwrap();
    assert_eq!(left, STARTING_SCORE - 100);

    // Close the window
    let resolved_at = start + SELECTING;
    assert_eq!(engine.advance_if_due(resolved_at).await, Some(Phase::Resolving));

    let alice = account(&engine, "alice").await;
    assert_eq!(alice.score, STARTING_SCORE - 100 + 18_100);
    assert_eq!(alice.plays, 1);
    assert_eq!(alice.max_record, 18_100);
    assert_eq!(engine.last_result("alice"), 18_000);

    let status = engine.status(Some("alice"), resolved_at).await.unwrap();
    assert_eq!(status.state, Phase::Resolving);
    assert_eq!(status.dice, [3, 3, 3]);
    assert_eq!(status.sum, 9);
    assert!(status.outcomes.contains(&Outcome::Triple(3)));
    assert!(!status.outcomes.contains(&Outcome::Small));
    assert_eq!(status.round_result, 18_000);
    assert_eq!(status.my_selections[&Outcome::Triple(3)], 100);
    assert_eq!(status.timer, 5);
    assert_eq!(status.history.len(), 1);
}

#[tokio::test]
async fn test_losing_round() {
    let (mut engine, start) = create_engine(Memory::new(), LoadedDice::always([1, 2, 4])).await;
    engine.stake("bob", Outcome::Big, 500, start).await.unwrap();
    engine.stake("bob", Outcome::Big, 250, start).await.unwrap();
    engine.advance_if_due(start + SELECTING).await;

    let bob = account(&engine, "bob").await;
    assert_eq!(bob.score, STARTING_SCORE - 750);
    assert_eq!(bob.plays, 1);
    assert_eq!(bob.max_record, 0);
    assert_eq!(engine.last_result("bob"), -750);
}

#[tokio::test]
async fn test_full_cycle_clears_round() {
    let (mut engine, start) =
        create_engine(Memory::new(), LoadedDice::new([[2, 4, 6], [1, 1, 2]])).await;
    engine.stake("alice", Outcome::Combo(2, 4), 50, start).await.unwrap();

    let resolved_at = start + SELECTING;
    engine.advance_if_due(resolved_at).await;
    assert_eq!(balance(&engine, "alice").await, STARTING_SCORE - 50 + 300);

    let reopened_at = resolved_at + RESOLVING;
    assert_eq!(engine.advance_if_due(reopened_at).await, Some(Phase::Selecting));
    assert_eq!(engine.round().round_id(), 2);
    assert!(engine.ledger().is_empty());
    assert_eq!(engine.last_result("alice"), 0);

    // Roll details are hidden again while selecting
    let status = engine.status(Some("alice"), reopened_at).await.unwrap();
    assert_eq!(status.state, Phase::Selecting);
    assert_eq!(status.dice, [0, 0, 0]);
    assert_eq!(status.sum, 0);
    assert!(status.outcomes.is_empty());
    assert!(status.my_selections.is_empty());
    assert_eq!(status.timer, 15);
    assert_eq!(status.history.len(), 1);
    assert_eq!(status.history[0].dice, [2, 4, 6]);
}

#[tokio::test]
async fn test_advances_once_per_deadline() {
    let (mut engine, start) = create_engine(Memory::new(), LoadedDice::always([1, 2, 3])).await;

    assert_eq!(engine.advance_if_due(start).await, None);
    assert_eq!(engine.advance_if_due(start + SELECTING - Duration::from_millis(1)).await, None);

    // A late driver still advances exactly one phase
    let late = start + SELECTING + Duration::from_secs(30);
    assert_eq!(engine.advance_if_due(late).await, Some(Phase::Resolving));
    assert_eq!(engine.advance_if_due(late).await, None);
    assert_eq!(engine.history().count(), 1);

    // The next deadline is measured from when the transition happened
    assert_eq!(engine.round().deadline(), late + RESOLVING);
    assert_eq!(engine.round().round_id(), 1);
}

#[tokio::test]
async fn test_stake_at_phase_boundary() {
    let (mut engine, start) = create_engine(Memory::new(), LoadedDice::always([1, 2, 3])).await;
    let deadline = engine.round().deadline();

    engine
        .stake("alice", Outcome::Small, 10, deadline - Duration::from_millis(1))
        .await
        .unwrap();

    // At the deadline the lazy check closes the window first
    let err = engine.stake("alice", Outcome::Small, 10, deadline).await.unwrap_err();
    assert!(matches!(err, Error::PhaseRejected));
    assert_eq!(engine.round().phase(), Phase::Resolving);

    // The stake that made it in was settled: [1, 2, 3] is small
    assert_eq!(balance(&engine, "alice").await, STARTING_SCORE + 10);
    assert_eq!(deadline, start + SELECTING);
}

#[tokio::test]
async fn test_stake_validation() {
    let (mut engine, start) = create_engine(Memory::new(), LoadedDice::always([1, 2, 3])).await;

    for points in [0, -5] {
        let err = engine.stake("alice", Outcome::Big, points, start).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    let err = engine
        .stake("alice", Outcome::Big, STARTING_SCORE + 1, start)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientBalance { balance, requested }
            if balance == STARTING_SCORE && requested == STARTING_SCORE + 1
    ));

    // Nothing was escrowed for the failed attempts
    assert!(engine.ledger().is_empty());
    assert_eq!(balance(&engine, "alice").await, STARTING_SCORE);

    // The whole balance may be staked
    engine.stake("alice", Outcome::Big, STARTING_SCORE, start).await.unwrap();
    assert_eq!(balance(&engine, "alice").await, 0);
}

#[tokio::test]
async fn test_oversized_stake_rejected() {
    let whale_score = i64::MAX / 100;
    let mut store = Memory::new();
    store.insert(Account {
        score: whale_score,
        ..Account::new("whale")
    });
    let (mut engine, start) = create_engine(store, LoadedDice::always([6, 6, 6])).await;

    // All-in on a triple could pay out past i64::MAX
    let err = engine
        .stake("whale", Outcome::Triple(6), whale_score, start)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(engine.ledger().is_empty());
    assert_eq!(balance(&engine, "whale").await, whale_score);

    // A stake whose best case still fits is accepted, and the round resolves with it
    let safe = (i64::MAX - whale_score) / 200;
    engine
        .stake("whale", Outcome::Triple(6), safe, start)
        .await
        .unwrap();
    assert_eq!(
        engine.advance_if_due(start + SELECTING).await,
        Some(Phase::Resolving)
    );
    assert_eq!(balance(&engine, "whale").await, whale_score - safe + safe * 181);

    // And the table keeps cycling
    assert_eq!(
        engine.advance_if_due(start + SELECTING + RESOLVING).await,
        Some(Phase::Selecting)
    );
}

#[tokio::test]
async fn test_stake_rejected_while_resolving() {
    let (mut engine, start) = create_engine(Memory::new(), LoadedDice::always([1, 2, 3])).await;
    let resolving = start + SELECTING;
    engine.advance_if_due(resolving).await;

    let err = engine.stake("alice", Outcome::Big, 10, resolving).await.unwrap_err();
    assert!(matches!(err, Error::PhaseRejected));
    let err = engine.cancel_stakes("alice", resolving).await.unwrap_err();
    assert!(matches!(err, Error::PhaseRejected));
}

#[tokio::test]
async fn test_stake_then_cancel_restores_balance() {
    let (mut engine, start) = create_engine(Memory::new(), LoadedDice::always([1, 2, 3])).await;
    engine.stake("alice", Outcome::Big, 300, start).await.unwrap();
    engine.stake("alice", Outcome::Total(7), 200, start).await.unwrap();
    engine.stake("bob", Outcome::Odd, 10, start).await.unwrap();
    assert_eq!(balance(&engine, "alice").await, STARTING_SCORE - 500);

    let refunded = engine.cancel_stakes("alice", start).await.unwrap();
    assert_eq!(refunded, 500);
    assert_eq!(balance(&engine, "alice").await, STARTING_SCORE);
    assert!(engine.ledger().get("alice").is_none());
    assert_eq!(engine.ledger().total("bob"), 10);

    // Nothing left to cancel
    assert_eq!(engine.cancel_stakes("alice", start).await.unwrap(), 0);
    assert_eq!(balance(&engine, "alice").await, STARTING_SCORE);
}

#[tokio::test]
async fn test_bonus_claim() {
    let mut store = Memory::new();
    store.insert(Account {
        score: 900,
        ..Account::new("alice")
    });
    let (mut engine, start) = create_engine(store, LoadedDice::always([1, 2, 3])).await;

    let account = engine.claim_bonus("alice", start).await.unwrap();
    assert_eq!(account.score, 900 + BONUS_AMOUNT);
    assert_eq!(account.last_claim_round, 1);

    // Retrying within the round always reports the earlier claim
    for _ in 0..3 {
        let err = engine.claim_bonus("alice", start).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyClaimed));
    }
    assert_eq!(balance(&engine, "alice").await, 900 + BONUS_AMOUNT);

    let status = engine.status(Some("alice"), start).await.unwrap();
    assert!(status.bonus_claimed);

    // Next round the claim is allowed again, but the balance is now too high
    let next_round = start + SELECTING + RESOLVING;
    engine.advance_if_due(start + SELECTING).await;
    engine.advance_if_due(next_round).await;
    assert_eq!(engine.round().round_id(), 2);
    let err = engine.claim_bonus("alice", next_round).await.unwrap_err();
    assert!(matches!(err, Error::BalanceTooHighToClaim { balance } if balance == 900 + BONUS_AMOUNT));
}

#[tokio::test]
async fn test_bonus_ceiling_is_inclusive() {
    let mut store = Memory::new();
    store.insert(Account {
        score: 1_000,
        ..Account::new("alice")
    });
    store.insert(Account {
        score: 1_001,
        ..Account::new("bob")
    });
    let (mut engine, start) = create_engine(store, LoadedDice::always([1, 2, 3])).await;

    assert!(engine.claim_bonus("alice", start).await.is_ok());
    let err = engine.claim_bonus("bob", start).await.unwrap_err();
    assert!(matches!(err, Error::BalanceTooHighToClaim { balance: 1_001 }));
    assert_eq!(balance(&engine, "bob").await, 1_001);
}

#[tokio::test]
async fn test_ranking_refresh() {
    let (mut engine, start) =
        create_engine(Memory::with_demo_accounts(), LoadedDice::always([6, 6, 6])).await;
    assert_eq!(engine.ranking().entries[0].nickname, "RichGuy");

    // A big win moves the player to the top once the round resolves
    engine.stake("alice", Outcome::Triple(6), 100_000, start).await.unwrap();
    engine.set_nickname("alice", "Alice", start).await.unwrap();
    assert_eq!(engine.ranking().entries.last().unwrap().nickname, "Newbie");
    assert!(engine.ranking().entries.iter().any(|e| e.nickname == "Alice"));
    engine.advance_if_due(start + SELECTING).await;
    assert_eq!(engine.ranking().entries[0].nickname, "Alice");
    assert_eq!(engine.ranking().entries[0].score, STARTING_SCORE + 18_000_000);
    assert_eq!(engine.ranking().entries[0].plays, 1);
}

#[tokio::test]
async fn test_ranking_is_not_recomputed_on_read() {
    let (mut engine, start) = create_engine(Memory::new(), LoadedDice::always([1, 2, 3])).await;
    engine.set_nickname("alice", "Alice", start).await.unwrap();
    assert_eq!(engine.ranking().entries[0].score, STARTING_SCORE);

    // Changes that do not trigger a refresh stay invisible until the next trigger
    engine.store_mut().credit("alice", 5).await.unwrap();
    let status = engine.status(Some("alice"), start).await.unwrap();
    assert_eq!(status.score, STARTING_SCORE + 5);
    assert_eq!(status.ranking[0].score, STARTING_SCORE);

    engine.set_nickname("alice", "Alicia", start).await.unwrap();
    assert_eq!(engine.ranking().entries[0].score, STARTING_SCORE + 5);
    assert_eq!(engine.ranking().entries[0].nickname, "Alicia");
}

#[tokio::test]
async fn test_history_is_bounded() {
    let (mut engine, start) = create_engine(Memory::new(), LoadedDice::always([4, 5, 6])).await;
    let mut now = start;
    for _ in 0..HISTORY_CAPACITY + 5 {
        now += SELECTING;
        assert_eq!(engine.advance_if_due(now).await, Some(Phase::Resolving));
        now += RESOLVING;
        assert_eq!(engine.advance_if_due(now).await, Some(Phase::Selecting));
    }
    assert_eq!(engine.history().count(), HISTORY_CAPACITY);
    assert_eq!(engine.round().round_id(), HISTORY_CAPACITY as u64 + 6);
}

#[tokio::test]
async fn test_history_is_most_recent_first() {
    let (mut engine, start) =
        create_engine(Memory::new(), LoadedDice::new([[1, 1, 1], [2, 2, 2]])).await;
    let first = start + SELECTING;
    engine.advance_if_due(first).await;
    engine.advance_if_due(first + RESOLVING).await;
    engine.advance_if_due(first + RESOLVING + SELECTING).await;

    let dice: Vec<_> = engine.history().map(|entry| entry.dice).collect();
    assert_eq!(dice, vec![[2, 2, 2], [1, 1, 1]]);
}

#[tokio::test]
async fn test_settlement_failure_does_not_stop_round() {
    let mut store = Flaky::new(Memory::new());
    store.failing.insert("bob".to_string());
    let (mut engine, start) = create_engine(store, LoadedDice::always([1, 2, 3])).await;

    engine.stake("alice", Outcome::Small, 100, start).await.unwrap();
    engine.stake("bob", Outcome::Small, 100, start).await.unwrap();
    assert_eq!(engine.advance_if_due(start + SELECTING).await, Some(Phase::Resolving));

    // Alice is paid, Bob's write was lost but his result is still recorded
    assert_eq!(balance(&engine, "alice").await, STARTING_SCORE + 100);
    assert_eq!(balance(&engine, "bob").await, STARTING_SCORE - 100);
    assert_eq!(engine.last_result("bob"), 100);
    assert_eq!(engine.history().count(), 1);
}

#[tokio::test]
async fn test_store_unavailable() {
    let (mut engine, start) =
        create_engine(Flaky::new(Memory::new()), LoadedDice::always([1, 2, 3])).await;
    engine.store_mut().down = true;

    let err = engine.stake("alice", Outcome::Big, 10, start).await.unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable(_)));
    assert!(engine.ledger().is_empty());

    let err = engine.claim_bonus("alice", start).await.unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable(_)));

    // Anonymous status does not touch the store
    let status = engine.status(None, start).await.unwrap();
    assert_eq!(status.score, 0);

    // Phase changes keep working while the store is down
    assert_eq!(engine.advance_if_due(start + SELECTING).await, Some(Phase::Resolving));
}

#[tokio::test]
async fn test_guest_status() {
    let (mut engine, start) = create_engine(Memory::new(), LoadedDice::always([1, 2, 3])).await;
    let status = engine
        .status(None, start + Duration::from_millis(10_200))
        .await
        .unwrap();
    assert_eq!(status.state, Phase::Selecting);
    assert_eq!(status.round_id, 1);
    assert_eq!(status.remaining_ms, 4_800);
    assert_eq!(status.timer, 5);
    assert_eq!(status.nickname, "Guest");
    assert!(!status.bonus_claimed);
    assert!(engine.store().is_empty());
}

//! Payout table.
//!
//! A winning stake returns the principal plus `stake * multiplier`.

use crate::outcome::Roll;
use tripledice_types::Outcome;

/// Specific triple (`TRIPLE_n`)
pub const TRIPLE_MULTIPLIER: i64 = 180;

/// Specific double (`DOUBLE_n`)
pub const DOUBLE_MULTIPLIER: i64 = 10;

/// Two-face combination (`COMBO_a_b`)
pub const COMBO_MULTIPLIER: i64 = 5;

/// Multiplier used when a table has no entry for a tag.
pub const DEFAULT_MULTIPLIER: i64 = 1;

/// Largest multiplier any tag can pay.
pub const MAX_MULTIPLIER: i64 = TRIPLE_MULTIPLIER;

/// Multipliers for tags without a face or sum attached.
fn flat_multiplier(outcome: Outcome) -> i64 {
    match outcome {
        Outcome::Small | Outcome::Big | Outcome::Odd | Outcome::Even => 1,
        Outcome::AnyTriple => 30,
        Outcome::AnyDouble => 5,
        Outcome::Triple(_) => TRIPLE_MULTIPLIER,
        Outcome::Double(_) => DOUBLE_MULTIPLIER,
        Outcome::Combo(..) => COMBO_MULTIPLIER,
        Outcome::Total(_) | Outcome::Single(_) => DEFAULT_MULTIPLIER,
    }
}

/// Payout table for total bets, symmetric around the center.
pub fn total_multiplier(sum: u8) -> i64 {
    match sum {
        4 | 17 => 60,
        5 | 16 => 30,
        6 | 15 => 18,
        7 | 14 => 12,
        8 | 13 => 8,
        9..=12 => 6,
        _ => DEFAULT_MULTIPLIER,
    }
}

/// Multiplier for a winning stake on `outcome` given the roll it won on.
pub fn multiplier(outcome: Outcome, roll: &Roll) -> i64 {
    match outcome {
        Outcome::Total(_) => total_multiplier(roll.sum),
        Outcome::Single(face) => roll.count(face) as i64,
        other => flat_multiplier(other),
    }
}

/// Points returned for one stake: principal plus winnings, or nothing if the tag missed.
pub fn stake_return(outcome: Outcome, stake: i64, roll: &Roll) -> i64 {
    if !roll.contains(outcome) {
        return 0;
    }
    stake
        .saturating_mul(multiplier(outcome, roll))
        .saturating_add(stake)
}

/// Largest amount a stake of `stake` could ever return, or `None` if it does not fit in an
/// `i64`.
pub fn max_return(stake: i64) -> Option<i64> {
    stake.checked_mul(MAX_MULTIPLIER)?.checked_add(stake)
}

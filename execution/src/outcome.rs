//! Derivation of outcome tags from a roll.

use std::collections::BTreeSet;
use tripledice_types::{game::DIE_FACES, Dice, Outcome};

/// A rolled triple together with every outcome it qualifies for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roll {
    pub dice: Dice,
    pub sum: u8,
    pub outcomes: BTreeSet<Outcome>,
}

impl Roll {
    /// Count occurrences of a specific face.
    pub fn count(&self, face: u8) -> u8 {
        count_face(&self.dice, face)
    }

    pub fn contains(&self, outcome: Outcome) -> bool {
        self.outcomes.contains(&outcome)
    }
}

fn count_face(dice: &Dice, face: u8) -> u8 {
    dice.iter().filter(|&&d| d == face).count() as u8
}

/// Check if dice form a triple (all same).
fn is_triple(dice: &Dice) -> bool {
    dice[0] == dice[1] && dice[1] == dice[2]
}

/// Compute the outcome set of a roll. Pure and deterministic.
///
/// Triples never qualify for SMALL, BIG, ODD or EVEN. Sums of 3 and 18 can only come from
/// triples, so SMALL covers 4..=10 and BIG covers 11..=17.
pub fn derive(dice: Dice) -> Roll {
    let sum: u8 = dice.iter().sum();
    let triple = is_triple(&dice);
    let mut outcomes = BTreeSet::new();

    if !triple {
        if (4..=10).contains(&sum) {
            outcomes.insert(Outcome::Small);
        }
        if (11..=17).contains(&sum) {
            outcomes.insert(Outcome::Big);
        }
        if sum % 2 == 1 {
            outcomes.insert(Outcome::Odd);
        } else {
            outcomes.insert(Outcome::Even);
        }
    }

    outcomes.insert(Outcome::Total(sum));

    if triple {
        outcomes.insert(Outcome::AnyTriple);
        outcomes.insert(Outcome::Triple(dice[0]));
    }

    let mut any_double = false;
    for face in 1..=DIE_FACES {
        let count = count_face(&dice, face);
        if count >= 1 {
            outcomes.insert(Outcome::Single(face));
        }
        if count >= 2 {
            outcomes.insert(Outcome::Double(face));
            any_double = true;
        }
    }
    if any_double {
        outcomes.insert(Outcome::AnyDouble);
    }

    // Every unordered pair of distinct faces present in the roll
    let mut faces = dice.to_vec();
    faces.sort_unstable();
    faces.dedup();
    for (i, &low) in faces.iter().enumerate() {
        for &high in &faces[i + 1..] {
            outcomes.insert(Outcome::Combo(low, high));
        }
    }

    Roll {
        dice,
        sum,
        outcomes,
    }
}

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::DIE_FACES;

/// Three die faces, each in `1..=6`.
pub type Dice = [u8; 3];

/// Returns true if `value` is a valid die face.
pub fn is_face(value: u8) -> bool {
    (1..=DIE_FACES).contains(&value)
}

/// A property of a rolled triple that a stake can target.
///
/// The string form is the tag clients send and receive (`SMALL`, `TOTAL_9`, `COMBO_2_4`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Outcome {
    /// Sum in 4..=10, not a triple
    Small,
    /// Sum in 11..=17, not a triple
    Big,
    /// Odd sum, not a triple
    Odd,
    /// Even sum, not a triple
    Even,
    /// Some face appears at least twice
    AnyDouble,
    /// All three faces equal
    AnyTriple,
    /// Exact sum (3..=18)
    Total(u8),
    /// All three faces show this value
    Triple(u8),
    /// This face appears at least twice
    Double(u8),
    /// This face appears at least once
    Single(u8),
    /// Both faces appear (low < high)
    Combo(u8, u8),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown outcome tag: {0}")]
pub struct ParseOutcomeError(pub String);

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Small => f.write_str("SMALL"),
            Outcome::Big => f.write_str("BIG"),
            Outcome::Odd => f.write_str("ODD"),
            Outcome::Even => f.write_str("EVEN"),
            Outcome::AnyDouble => f.write_str("ANY_DOUBLE"),
            Outcome::AnyTriple => f.write_str("ANY_TRIPLE"),
            Outcome::Total(sum) => write!(f, "TOTAL_{sum}"),
            Outcome::Triple(face) => write!(f, "TRIPLE_{face}"),
            Outcome::Double(face) => write!(f, "DOUBLE_{face}"),
            Outcome::Single(face) => write!(f, "SINGLE_{face}"),
            Outcome::Combo(low, high) => write!(f, "COMBO_{low}_{high}"),
        }
    }
}

impl FromStr for Outcome {
    type Err = ParseOutcomeError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let err = || ParseOutcomeError(tag.to_string());
        let face = |raw: &str| raw.parse::<u8>().ok().filter(|v| is_face(*v)).ok_or_else(err);

        match tag {
            "SMALL" => return Ok(Outcome::Small),
            "BIG" => return Ok(Outcome::Big),
            "ODD" => return Ok(Outcome::Odd),
            "EVEN" => return Ok(Outcome::Even),
            "ANY_DOUBLE" => return Ok(Outcome::AnyDouble),
            "ANY_TRIPLE" => return Ok(Outcome::AnyTriple),
            _ => {}
        }

        let (kind, rest) = tag.split_once('_').ok_or_else(err)?;
        match kind {
            "TOTAL" => {
                let sum = rest.parse::<u8>().map_err(|_| err())?;
                if !(3..=3 * DIE_FACES).contains(&sum) {
                    return Err(err());
                }
                Ok(Outcome::Total(sum))
            }
            "TRIPLE" => Ok(Outcome::Triple(face(rest)?)),
            "DOUBLE" => Ok(Outcome::Double(face(rest)?)),
            "SINGLE" => Ok(Outcome::Single(face(rest)?)),
            "COMBO" => {
                let (low, high) = rest.split_once('_').ok_or_else(err)?;
                let (low, high) = (face(low)?, face(high)?);
                if low >= high {
                    return Err(err());
                }
                Ok(Outcome::Combo(low, high))
            }
            _ => Err(err()),
        }
    }
}

impl From<Outcome> for String {
    fn from(outcome: Outcome) -> Self {
        outcome.to_string()
    }
}

impl TryFrom<String> for Outcome {
    type Error = ParseOutcomeError;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        tag.parse()
    }
}

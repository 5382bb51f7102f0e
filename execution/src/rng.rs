//! Dice source.

use rand::{rngs::StdRng, Rng, SeedableRng};
use tripledice_types::{game::DIE_FACES, Dice};

/// Produces the dice for each resolution.
pub trait Roller: Send + Sync {
    fn roll(&mut self) -> Dice;
}

/// Random number generator backing the table.
///
/// Seeded from the OS by default; a fixed seed makes a session's rolls reproducible.
pub struct GameRng {
    rng: StdRng,
}

impl GameRng {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Roll a single die (1-6).
    pub fn roll_die(&mut self) -> u8 {
        self.rng.gen_range(1..=DIE_FACES)
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl Roller for GameRng {
    fn roll(&mut self) -> Dice {
        [self.roll_die(), self.roll_die(), self.roll_die()]
    }
}

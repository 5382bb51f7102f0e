//! Round state machine.
//!
//! Phases advance on absolute deadlines. Remaining time is always recomputed as
//! `deadline - now`, so a late driver never accumulates drift.

use crate::outcome::Roll;
use std::time::{Duration, Instant};
use tripledice_types::{
    game::{RESOLVING_SECS, SELECTING_SECS},
    Phase,
};

/// Phase durations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub selecting: Duration,
    pub resolving: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            selecting: Duration::from_secs(SELECTING_SECS),
            resolving: Duration::from_secs(RESOLVING_SECS),
        }
    }
}

impl Timing {
    pub fn duration(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Selecting => self.selecting,
            Phase::Resolving => self.resolving,
        }
    }
}

/// Round state
#[derive(Clone, Debug)]
pub struct Round {
    phase: Phase,
    round_id: u64,
    deadline: Instant,
    roll: Option<Roll>,
}

impl Round {
    /// First round: selecting, id 1.
    pub fn new(timing: &Timing, now: Instant) -> Self {
        Self {
            phase: Phase::Selecting,
            round_id: 1,
            deadline: now + timing.selecting,
            roll: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round_id(&self) -> u64 {
        self.round_id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    /// The roll of this round, only while it is being shown.
    pub fn visible_roll(&self) -> Option<&Roll> {
        match self.phase {
            Phase::Resolving => self.roll.as_ref(),
            Phase::Selecting => None,
        }
    }

    /// Selecting -> Resolving.
    pub(crate) fn begin_resolving(&mut self, roll: Roll, timing: &Timing, now: Instant) {
        debug_assert_eq!(self.phase, Phase::Selecting);
        self.phase = self.phase.next();
        self.roll = Some(roll);
        self.deadline = now + timing.resolving;
    }

    /// Resolving -> Selecting, starting the next round.
    pub(crate) fn begin_selecting(&mut self, timing: &Timing, now: Instant) {
        debug_assert_eq!(self.phase, Phase::Resolving);
        self.phase = self.phase.next();
        self.round_id += 1;
        self.roll = None;
        self.deadline = now + timing.selecting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::derive;

    #[test]
    fn test_cycle() {
        let timing = Timing::default();
        let start = Instant::now();
        let mut round = Round::new(&timing, start);
        assert_eq!(round.phase(), Phase::Selecting);
        assert_eq!(round.round_id(), 1);
        assert_eq!(round.deadline(), start + Duration::from_secs(15));
        assert!(round.visible_roll().is_none());

        let now = start + Duration::from_secs(15);
        assert!(round.is_due(now));
        round.begin_resolving(derive([1, 2, 3]), &timing, now);
        assert_eq!(round.phase(), Phase::Resolving);
        assert_eq!(round.round_id(), 1);
        assert_eq!(round.deadline(), now + Duration::from_secs(5));
        assert_eq!(round.visible_roll().unwrap().dice, [1, 2, 3]);

        let now = now + Duration::from_secs(5);
        round.begin_selecting(&timing, now);
        assert_eq!(round.phase(), Phase::Selecting);
        assert_eq!(round.round_id(), 2);
        assert!(round.visible_roll().is_none());
    }

    #[test]
    fn test_remaining_is_recomputed() {
        let timing = Timing::default();
        let start = Instant::now();
        let round = Round::new(&timing, start);

        assert_eq!(round.remaining(start), Duration::from_secs(15));
        assert_eq!(
            round.remaining(start + Duration::from_millis(14_500)),
            Duration::from_millis(500)
        );
        assert!(!round.is_due(start + Duration::from_millis(14_999)));

        // Never negative once the deadline has passed
        assert_eq!(round.remaining(start + Duration::from_secs(20)), Duration::ZERO);
        assert!(round.is_due(start + Duration::from_secs(20)));
    }
}

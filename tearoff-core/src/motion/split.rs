//! Split-cycle pacing for tilt moves
//!
//! The remaining distance of a tilt phase is not covered in one sweep.
//! It is divided into `cycles` sub-moves with a pause between consecutive
//! ones, which keeps the peak separation force low.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum number of cycles accepted by profile validation
pub const MAX_CYCLES: u8 = 10;

/// A single step produced by [`CycleSplit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SplitStep {
    /// Relative move by the given number of steps
    Move(i32),
    /// Pause in milliseconds
    Wait(u32),
}

/// Iterator over the sub-moves and pauses of one tilt phase
///
/// The sub-moves always add up to the full distance: every move covers
/// `distance / cycles` and the last one also takes the integer remainder.
/// Pauses are only emitted between moves, never after the last one, and
/// never for a zero delay. `cycles == 0` yields a single move.
#[derive(Debug, Clone)]
pub struct CycleSplit {
    distance: i32,
    per_move: i32,
    moves: u8,
    issued: u8,
    delay_ms: u32,
    wait_pending: bool,
}

impl CycleSplit {
    /// Create a split of `distance` into `cycles` sub-moves
    pub fn new(distance: i32, cycles: u8, delay_ms: u32) -> Self {
        let moves = cycles.max(1);
        Self {
            distance,
            per_move: distance / moves as i32,
            moves,
            issued: 0,
            delay_ms: if cycles == 0 { 0 } else { delay_ms },
            wait_pending: false,
        }
    }

    /// Total distance covered by all sub-moves
    pub fn distance(&self) -> i32 {
        self.distance
    }

    /// Number of sub-moves this split produces
    pub fn moves(&self) -> u8 {
        self.moves
    }

    /// Check if every step has been yielded
    pub fn is_finished(&self) -> bool {
        self.issued >= self.moves && !self.wait_pending
    }

    fn move_len(&self, index: u8) -> i32 {
        if index + 1 == self.moves {
            self.distance - self.per_move * (self.moves as i32 - 1)
        } else {
            self.per_move
        }
    }
}

impl Iterator for CycleSplit {
    type Item = SplitStep;

    fn next(&mut self) -> Option<SplitStep> {
        if self.wait_pending {
            self.wait_pending = false;
            return Some(SplitStep::Wait(self.delay_ms));
        }

        if self.issued >= self.moves {
            return None;
        }

        let steps = self.move_len(self.issued);
        self.issued += 1;

        if self.issued < self.moves && self.delay_ms > 0 {
            self.wait_pending = true;
        }

        Some(SplitStep::Move(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    fn collect(split: CycleSplit) -> Vec<SplitStep, 32> {
        let mut steps = Vec::new();
        for step in split {
            steps.push(step).unwrap();
        }
        steps
    }

    #[test]
    fn test_even_split() {
        let steps = collect(CycleSplit::new(-4000, 2, 50));

        assert_eq!(
            steps.as_slice(),
            &[
                SplitStep::Move(-2000),
                SplitStep::Wait(50),
                SplitStep::Move(-2000)
            ]
        );
    }

    #[test]
    fn test_remainder_goes_to_last_move() {
        let steps = collect(CycleSplit::new(1000, 3, 0));

        assert_eq!(
            steps.as_slice(),
            &[
                SplitStep::Move(333),
                SplitStep::Move(333),
                SplitStep::Move(334)
            ]
        );
    }

    #[test]
    fn test_zero_cycles_is_single_move() {
        let steps = collect(CycleSplit::new(-4928, 0, 500));

        // No pause even though a delay is configured
        assert_eq!(steps.as_slice(), &[SplitStep::Move(-4928)]);
    }

    #[test]
    fn test_single_cycle_has_no_wait() {
        let steps = collect(CycleSplit::new(-650, 1, 1000));
        assert_eq!(steps.as_slice(), &[SplitStep::Move(-650)]);
    }

    #[test]
    fn test_finished_tracking() {
        let mut split = CycleSplit::new(100, 2, 10);
        assert!(!split.is_finished());
        assert_eq!(split.moves(), 2);

        split.next();
        split.next();
        assert!(!split.is_finished());

        split.next();
        assert!(split.is_finished());
        assert_eq!(split.next(), None);
    }
}

//! Seeded random replacement.

use super::ReplacementState;
use crate::common::Randomizer;

/// Random usage state: access history is ignored.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    ways: usize,
    rng: Randomizer,
}

impl RandomPolicy {
    /// Creates the state of a `ways`-way buffer with the default seed.
    pub fn new(ways: usize) -> Self {
        Self {
            ways,
            rng: Randomizer::default(),
        }
    }
}

impl ReplacementState for RandomPolicy {
    fn update(&mut self, _set: usize, _way: usize) {}

    fn victim(&mut self, _set: usize) -> usize {
        self.rng.index(self.ways)
    }
}

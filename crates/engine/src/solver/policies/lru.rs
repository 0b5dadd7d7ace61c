//! Least recently used.
//!
//! A usage stack per set: an accessed way moves to the top, the victim is the way at the
//! bottom. Ways never accessed keep their initial order below the accessed ones, so an
//! empty set is filled from way 0 upwards.

use super::ReplacementState;

/// LRU usage state.
#[derive(Debug, Clone)]
pub struct LruPolicy {
    /// Usage stack per set; index 0 is the most recently used way.
    usage: Vec<Vec<usize>>,
}

impl LruPolicy {
    /// Creates the state of a `sets` x `ways` buffer.
    ///
    /// # Arguments
    ///
    /// * `sets` - Number of sets.
    /// * `ways` - Associativity.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            usage: (0..sets).map(|_| (0..ways).rev().collect()).collect(),
        }
    }
}

impl ReplacementState for LruPolicy {
    fn update(&mut self, set: usize, way: usize) {
        let stack = &mut self.usage[set];
        stack.retain(|&w| w != way);
        stack.insert(0, way);
    }

    fn victim(&mut self, set: usize) -> usize {
        self.usage[set].last().copied().unwrap_or(0)
    }
}

//! Most recently used.

use super::ReplacementState;

/// MRU usage state.
#[derive(Debug, Clone)]
pub struct MruPolicy {
    /// Usage stack per set; index 0 is the most recently used way (the victim).
    usage: Vec<Vec<usize>>,
}

impl MruPolicy {
    /// Creates the state of a `sets` x `ways` buffer.
    ///
    /// # Arguments
    ///
    /// * `sets` - Number of sets.
    /// * `ways` - Associativity.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            usage: (0..sets).map(|_| (0..ways).collect()).collect(),
        }
    }
}

impl ReplacementState for MruPolicy {
    fn update(&mut self, set: usize, way: usize) {
        let stack = &mut self.usage[set];
        stack.retain(|&w| w != way);
        stack.insert(0, way);
    }

    fn victim(&mut self, set: usize) -> usize {
        self.usage[set].first().copied().unwrap_or(0)
    }
}

//! First in, first out.
//!
//! A round-robin pointer per set. The pointer only advances when the way it designates is
//! filled; hits do not change the eviction order.

use super::ReplacementState;

/// FIFO usage state.
#[derive(Debug, Clone)]
pub struct FifoPolicy {
    /// Next way to evict, per set.
    next_way: Vec<usize>,
    ways: usize,
}

impl FifoPolicy {
    /// Creates the state of a `sets` x `ways` buffer.
    ///
    /// # Arguments
    ///
    /// * `sets` - Number of sets.
    /// * `ways` - Associativity.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            next_way: vec![0; sets],
            ways: ways.max(1),
        }
    }
}

impl ReplacementState for FifoPolicy {
    fn update(&mut self, set: usize, way: usize) {
        if self.next_way[set] == way {
            self.next_way[set] = (way + 1) % self.ways;
        }
    }

    fn hit(&mut self, _set: usize, _way: usize) {}

    fn victim(&mut self, set: usize) -> usize {
        self.next_way[set]
    }
}

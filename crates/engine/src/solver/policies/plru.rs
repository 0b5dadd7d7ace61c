//! Bit-per-way pseudo-LRU.
//!
//! Each set keeps one "recently used" bit per way. An access sets the way's bit; when every
//! bit would be set, all bits but the accessed one are cleared. The victim is the lowest way
//! whose bit is clear.

use super::ReplacementState;

/// PLRU usage state.
#[derive(Debug, Clone)]
pub struct PlruPolicy {
    /// Used-bit mask per set.
    usage: Vec<u64>,
    ways: usize,
}

impl PlruPolicy {
    /// Creates the state of a `sets` x `ways` buffer (`ways <= 64`).
    ///
    /// # Arguments
    ///
    /// * `sets` - Number of sets.
    /// * `ways` - Associativity.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            usage: vec![0; sets],
            ways: ways.min(64),
        }
    }

    const fn full(&self) -> u64 {
        if self.ways >= 64 { u64::MAX } else { (1 << self.ways) - 1 }
    }
}

impl ReplacementState for PlruPolicy {
    fn update(&mut self, set: usize, way: usize) {
        let bit = 1u64 << way;
        let full = self.full();
        let usage = &mut self.usage[set];
        *usage |= bit;
        if *usage & full == full {
            *usage = bit;
        }
    }

    fn victim(&mut self, set: usize) -> usize {
        let usage = self.usage[set];
        (0..self.ways).find(|&w| (usage >> w) & 1 == 0).unwrap_or(0)
    }
}

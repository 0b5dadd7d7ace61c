//! Replacement policies replayed by the buffer state tracker.
//!
//! Each policy keeps per-set usage state and names the way to evict:
//! - `Lru`: Least recently used.
//! - `Fifo`: Round robin over the ways.
//! - `Plru`: Bit-per-way pseudo-LRU.
//! - `Mru`: Most recently used.
//! - `Random`: Seeded xorshift.

/// First-in, first-out.
pub mod fifo;

/// Least recently used.
pub mod lru;

/// Most recently used.
pub mod mru;

/// Bit-per-way pseudo-LRU.
pub mod plru;

/// Seeded random.
pub mod random;

pub use fifo::FifoPolicy;
pub use lru::LruPolicy;
pub use mru::MruPolicy;
pub use plru::PlruPolicy;
pub use random::RandomPolicy;

use std::fmt;

use crate::model::ReplacementPolicy;

/// Usage state of a set-associative buffer under some replacement policy.
pub trait ReplacementState: fmt::Debug {
    /// Records an access to `way` of `set`.
    ///
    /// # Arguments
    ///
    /// * `set` - Set number.
    /// * `way` - Way accessed (hit or filled).
    fn update(&mut self, set: usize, way: usize);

    /// Records a hit on `way` of `set`; policies ordering ways by fill time ignore it.
    fn hit(&mut self, set: usize, way: usize) {
        self.update(set, way);
    }

    /// Selects the way of `set` to evict.
    ///
    /// # Arguments
    ///
    /// * `set` - Set number.
    ///
    /// # Returns
    ///
    /// The way to evict.
    fn victim(&mut self, set: usize) -> usize;
}

/// Creates the usage state of `policy` for a `sets` x `ways` buffer.
pub fn for_policy(policy: ReplacementPolicy, sets: usize, ways: usize) -> Box<dyn ReplacementState> {
    match policy {
        ReplacementPolicy::Lru => Box::new(LruPolicy::new(sets, ways)),
        ReplacementPolicy::Fifo => Box::new(FifoPolicy::new(sets, ways)),
        ReplacementPolicy::Plru => Box::new(PlruPolicy::new(sets, ways)),
        ReplacementPolicy::Mru => Box::new(MruPolicy::new(sets, ways)),
        ReplacementPolicy::Random => Box::new(RandomPolicy::new(ways)),
    }
}

//! Seeded pseudo-random number generator.
//!
//! A xorshift generator: cheap, deterministic for a given seed, and good enough to
//! diversify address choices and break ties in the solver. Every component that needs
//! randomness receives a `&mut Randomizer` explicitly.

/// Seed used when a zero seed is supplied (xorshift has a fixed point at zero).
pub const DEFAULT_SEED: u64 = 123456789;

/// Xorshift pseudo-random number generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Randomizer {
    state: u64,
}

impl Randomizer {
    /// Creates a generator from `seed`.
    pub const fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { DEFAULT_SEED } else { seed },
        }
    }

    /// Returns the next 64-bit value.
    pub const fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Returns a random boolean.
    pub const fn next_bool(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }

    /// Returns a value in `0..bound`, or `0` when `bound == 0`.
    pub const fn below(&mut self, bound: u64) -> u64 {
        if bound == 0 { 0 } else { self.next_u64() % bound }
    }

    /// Returns a value in `min..=max`.
    ///
    /// # Arguments
    ///
    /// * `min` - Inclusive lower bound.
    /// * `max` - Inclusive upper bound; must not be below `min`.
    pub const fn range_inclusive(&mut self, min: u64, max: u64) -> u64 {
        let span = max.wrapping_sub(min);
        if span == u64::MAX {
            self.next_u64()
        } else {
            min + self.below(span + 1)
        }
    }

    /// Returns a random index into a collection of `len` items.
    pub const fn index(&mut self, len: usize) -> usize {
        self.below(len as u64) as usize
    }

    /// Picks a random element of `items`.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.index(items.len()))
        }
    }

    /// Shuffles `items` in place (Fisher-Yates).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }
}

impl Default for Randomizer {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

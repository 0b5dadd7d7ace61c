//! Bounded pool of issuable values.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::common::Randomizer;

/// Failure to issue a value from a pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// Every value of the pool that satisfies the request has been issued.
    #[error("{resource} exhausted ({capacity} values)")]
    Exhausted {
        /// What was being allocated.
        resource: String,
        /// Size of the pool.
        capacity: usize,
    },
}

/// A fixed pool of candidate values, each issued at most once until [`reset`].
///
/// [`reset`]: AllocationTable::reset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationTable<T: Ord + Copy> {
    name: String,
    pool: Vec<T>,
    issued: BTreeSet<T>,
}

impl<T: Ord + Copy> AllocationTable<T> {
    /// Creates a table over `pool`; duplicate values are dropped.
    ///
    /// # Arguments
    ///
    /// * `name` - Resource name used in exhaustion errors.
    /// * `pool` - Candidate values.
    pub fn new(name: impl Into<String>, pool: impl IntoIterator<Item = T>) -> Self {
        let mut seen = BTreeSet::new();
        let pool = pool.into_iter().filter(|v| seen.insert(*v)).collect();
        Self {
            name: name.into(),
            pool,
            issued: BTreeSet::new(),
        }
    }

    /// Number of candidate values.
    pub fn capacity(&self) -> usize {
        self.pool.len()
    }

    /// Number of values issued since the last reset.
    pub fn issued(&self) -> usize {
        self.issued.len()
    }

    /// Returns whether `value` has been issued.
    pub fn is_issued(&self, value: &T) -> bool {
        self.issued.contains(value)
    }

    /// Issues a random unissued value.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Exhausted`] when every value has been issued.
    pub fn allocate(&mut self, rng: &mut Randomizer) -> Result<T, AllocError> {
        self.allocate_where(rng, |_| true)
    }

    /// Issues a random unissued value accepted by `admit`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Exhausted`] when no unissued value is accepted.
    pub fn allocate_where(
        &mut self,
        rng: &mut Randomizer,
        admit: impl Fn(&T) -> bool,
    ) -> Result<T, AllocError> {
        let free: Vec<T> = self
            .pool
            .iter()
            .filter(|v| !self.issued.contains(*v) && admit(v))
            .copied()
            .collect();
        let Some(&value) = rng.choose(&free) else {
            return Err(AllocError::Exhausted {
                resource: self.name.clone(),
                capacity: self.pool.len(),
            });
        };
        let _ = self.issued.insert(value);
        Ok(value)
    }

    /// Marks `value` as issued without drawing it; returns `false` if it already was.
    pub fn claim(&mut self, value: T) -> bool {
        self.issued.insert(value)
    }

    /// Makes every value issuable again.
    pub fn reset(&mut self) {
        self.issued.clear();
    }
}

//! Preparation loads.
//!
//! Loads are executed, in insertion order, before the accesses of a structure. A hit load
//! brings a tag into a buffer so that a later access hits; a miss load (eviction) fills a
//! set with other tags so that a later access misses.

use serde::Serialize;

use crate::model::{AddressId, BufferEvent, BufferId};

/// A single preparation access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Load {
    /// Buffer the load targets.
    pub buffer: BufferId,
    /// Event the load prepares for the targeted access (`HIT` primes, `MISS` evicts).
    pub event: BufferEvent,
    /// Address type of the load.
    pub address_type: AddressId,
    /// Address value.
    pub address: u64,
    /// Entry of the parent buffer the load goes through, for loads into views.
    pub entry: Option<usize>,
}

/// Ordered preparation loads of a solution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Loader {
    loads: Vec<Load>,
}

impl Loader {
    /// Creates an empty loader.
    pub const fn new() -> Self {
        Self { loads: Vec::new() }
    }

    /// Appends a load.
    pub fn add_load(&mut self, load: Load) {
        self.loads.push(load);
    }

    /// Appends loads in order.
    pub fn add_loads(&mut self, loads: impl IntoIterator<Item = Load>) {
        self.loads.extend(loads);
    }

    /// All loads in execution order.
    pub fn loads(&self) -> &[Load] {
        &self.loads
    }

    /// Loads targeting `buffer`.
    pub fn loads_for(&self, buffer: BufferId) -> impl Iterator<Item = &Load> {
        self.loads.iter().filter(move |l| l.buffer == buffer)
    }

    /// Loads of the address type `address_type`; each of them passes through every buffer
    /// keyed by that address type.
    pub fn loads_of(&self, address_type: AddressId) -> impl Iterator<Item = &Load> {
        self.loads.iter().filter(move |l| l.address_type == address_type)
    }

    /// Number of loads.
    pub fn len(&self) -> usize {
        self.loads.len()
    }

    /// Returns whether there is no load.
    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }
}

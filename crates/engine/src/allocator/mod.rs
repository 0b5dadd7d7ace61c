//! Bounded, resettable resource issuance.
//!
//! The solver draws two kinds of resources while resolving a structure:
//! 1. **Entry ids:** Slots of non-replaceable buffers, at most `ways * sets` per buffer.
//! 2. **Addresses:** Fresh tags within a set, used to evict it.
//!
//! Both are reset before each structure is solved; exhaustion is reported as
//! [`AllocError`] and turned into an unsatisfiable result by the solver.

/// Address allocation by tag.
pub mod address;
/// Entry id allocation.
pub mod entry;
/// Bounded pool of issuable values.
pub mod table;

pub use address::AddressAllocator;
pub use entry::EntryIdAllocator;
pub use table::{AllocError, AllocationTable};

/// The allocators used by one solver run.
#[derive(Debug, Clone)]
pub struct Allocators {
    /// Address allocator.
    pub addresses: AddressAllocator,
    /// Entry id allocator.
    pub entries: EntryIdAllocator,
}

impl Allocators {
    /// Creates allocators; `table_size` bounds the sampled tag pools.
    pub const fn new(table_size: usize) -> Self {
        Self {
            addresses: AddressAllocator::new(table_size),
            entries: EntryIdAllocator::new(),
        }
    }

    /// Resets both allocators.
    pub fn reset(&mut self) {
        self.addresses.reset();
        self.entries.reset();
    }
}

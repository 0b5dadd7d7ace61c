//! Entry id allocation.

use std::collections::BTreeMap;

use super::table::{AllocError, AllocationTable};
use crate::common::Randomizer;
use crate::model::{BufferId, Subsystem};

/// Issues entry ids per buffer, each in `0..ways * sets`.
#[derive(Debug, Clone, Default)]
pub struct EntryIdAllocator {
    tables: BTreeMap<BufferId, AllocationTable<u64>>,
}

impl EntryIdAllocator {
    /// Creates an allocator with no table; tables are created on first use.
    pub const fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// Issues an id of `buffer` not issued since the last reset.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Exhausted`] once `ways * sets` ids are in use.
    pub fn allocate(
        &mut self,
        subsystem: &Subsystem,
        buffer: BufferId,
        rng: &mut Randomizer,
    ) -> Result<u64, AllocError> {
        self.tables
            .entry(buffer)
            .or_insert_with(|| {
                let b = subsystem.buffer(buffer);
                AllocationTable::new(format!("{} entries", b.name), 0..b.capacity() as u64)
            })
            .allocate(rng)
    }

    /// Number of ids of `buffer` in use.
    pub fn issued(&self, buffer: BufferId) -> usize {
        self.tables.get(&buffer).map_or(0, AllocationTable::issued)
    }

    /// Makes every id reusable.
    pub fn reset(&mut self) {
        for table in self.tables.values_mut() {
            table.reset();
        }
    }
}

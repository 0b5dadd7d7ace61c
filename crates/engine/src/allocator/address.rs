//! Address allocation by tag.
//!
//! Evicting a set requires fresh addresses that land in the same set as a given address:
//! the allocator keeps every bit of that address except the tag and draws tags from a pool
//! per `(buffer, untagged address, region)`. Tags up to 16 bits wide are enumerated; wider
//! tags are sampled into a pool of `table_size` candidates.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use super::table::{AllocError, AllocationTable};
use crate::common::{bits, Randomizer};
use crate::config::RegionSettings;
use crate::model::{Buffer, BufferId, Subsystem};

/// Widest tag whose values are enumerated exhaustively.
const ENUMERABLE_TAG_BITS: u32 = 16;

/// Sampling attempts per pool slot for wide tags.
const SAMPLE_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PoolKey {
    buffer: BufferId,
    untagged: u64,
    region: Option<String>,
}

/// Issues addresses sharing everything but the tag with a given address.
#[derive(Debug, Clone)]
pub struct AddressAllocator {
    table_size: usize,
    tables: BTreeMap<PoolKey, AllocationTable<u64>>,
}

impl AddressAllocator {
    /// Creates an allocator sampling `table_size` candidates for wide tags.
    pub const fn new(table_size: usize) -> Self {
        Self {
            table_size,
            tables: BTreeMap::new(),
        }
    }

    /// Issues an address that differs from `address` only in its `buffer` tag.
    ///
    /// # Arguments
    ///
    /// * `subsystem` - Model owning the buffer.
    /// * `buffer` - Buffer whose tag bits are replaced.
    /// * `address` - Address providing every other bit (index, offset, ...).
    /// * `region` - Range the issued address must lie in, if any.
    /// * `exclude` - Tags that must not be issued.
    /// * `rng` - Randomizer.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Exhausted`] when no unissued admissible tag remains.
    pub fn allocate_tag(
        &mut self,
        subsystem: &Subsystem,
        buffer: BufferId,
        address: u64,
        region: Option<&RegionSettings>,
        exclude: &BTreeSet<u64>,
        rng: &mut Randomizer,
    ) -> Result<u64, AllocError> {
        let b = subsystem.buffer(buffer);
        let key = PoolKey {
            buffer,
            untagged: b.with_tag(address, 0),
            region: region.map(|r| r.name.clone()),
        };
        let table_size = self.table_size;
        let table = self
            .tables
            .entry(key)
            .or_insert_with(|| Self::pool(b, address, region, table_size, rng));
        let tag = table.allocate_where(rng, |t| !exclude.contains(t))?;
        let issued = b.with_tag(address, tag);
        trace!(buffer = %b.name, tag, address = issued, "allocated address");
        Ok(issued)
    }

    fn pool(
        buffer: &Buffer,
        address: u64,
        region: Option<&RegionSettings>,
        table_size: usize,
        rng: &mut Randomizer,
    ) -> AllocationTable<u64> {
        let width = buffer.tag.width();
        let fits = |tag: u64| region.is_none_or(|r| r.contains(buffer.with_tag(address, tag)));
        let name = format!("{} tags", buffer.name);
        if width <= ENUMERABLE_TAG_BITS {
            return AllocationTable::new(name, (0..1u64 << width).filter(|&t| fits(t)));
        }
        let mut tags = BTreeSet::new();
        for _ in 0..table_size * SAMPLE_ATTEMPTS {
            if tags.len() >= table_size {
                break;
            }
            let tag = match region {
                Some(r) => buffer.tag_of(rng.range_inclusive(r.min, r.max)),
                None => rng.next_u64() & bits::mask(width),
            };
            if fits(tag) {
                let _ = tags.insert(tag);
            }
        }
        AllocationTable::new(name, tags)
    }

    /// Forgets every issued address.
    pub fn reset(&mut self) {
        self.tables.clear();
    }
}

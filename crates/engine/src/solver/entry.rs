//! Entries of non-replaceable buffers.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::access::path::BufferAccess;
use crate::model::{BufferId, VarId};

/// One slot of a non-replaceable buffer (a page-table or joint-TLB entry).
///
/// An entry is keyed by an address and holds a value per entry field. Fields become
/// pinned once written so that accesses sharing the entry agree on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryObject {
    id: u64,
    buffer: BufferId,
    access: BufferAccess,
    address: Option<u64>,
    fields: BTreeMap<VarId, u64>,
    referrers: BTreeSet<usize>,
    loads: usize,
}

impl EntryObject {
    /// Creates an empty entry allocated by the lookup `access`.
    pub const fn new(id: u64, access: BufferAccess) -> Self {
        Self {
            id,
            buffer: access.buffer,
            access,
            address: None,
            fields: BTreeMap::new(),
            referrers: BTreeSet::new(),
            loads: 0,
        }
    }

    /// Allocator-issued id, unique within the buffer.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Buffer holding the entry.
    pub const fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Lookup that allocated the entry.
    pub const fn access(&self) -> BufferAccess {
        self.access
    }

    /// Address the entry is keyed by, once known.
    pub const fn address(&self) -> Option<u64> {
        self.address
    }

    /// Sets the key address.
    pub fn set_address(&mut self, address: u64) {
        self.address = Some(address);
    }

    /// Field values written so far.
    pub const fn fields(&self) -> &BTreeMap<VarId, u64> {
        &self.fields
    }

    /// Value of `field`, if written.
    pub fn field(&self, field: VarId) -> Option<u64> {
        self.fields.get(&field).copied()
    }

    /// Returns whether `field` is already written.
    pub fn is_pinned(&self, field: VarId) -> bool {
        self.fields.contains_key(&field)
    }

    /// Writes `field` unless it is pinned; returns whether it was written.
    pub fn set_field(&mut self, field: VarId, value: u64) -> bool {
        if self.is_pinned(field) {
            return false;
        }
        let _ = self.fields.insert(field, value);
        true
    }

    /// Records that access `index` refers to the entry.
    pub fn add_referrer(&mut self, index: usize) {
        let _ = self.referrers.insert(index);
    }

    /// Accesses referring to the entry.
    pub const fn referrers(&self) -> &BTreeSet<usize> {
        &self.referrers
    }

    /// Records a load going through the entry.
    pub const fn add_load(&mut self) {
        self.loads += 1;
    }

    /// Number of loads going through the entry.
    pub const fn loads(&self) -> usize {
        self.loads
    }

    /// Returns whether only loads refer to the entry.
    pub fn is_auxiliary(&self) -> bool {
        self.referrers.is_empty() && self.loads > 0
    }
}

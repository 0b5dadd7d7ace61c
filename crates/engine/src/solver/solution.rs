//! Solutions of structures.

use std::collections::BTreeMap;

use serde::Serialize;

use super::address_object::AddressObject;
use super::entry::EntryObject;
use super::loader::Loader;
use crate::access::path::BufferAccess;
use crate::access::structure::Structure;
use crate::model::BufferId;

/// Concrete realization of a structure: per-access values, buffer entries and the
/// preparation loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Solution {
    #[serde(skip)]
    structure: Structure,
    addresses: Vec<AddressObject>,
    entries: Vec<EntryObject>,
    loader: Loader,
}

impl Solution {
    pub(crate) const fn new(
        structure: Structure,
        addresses: Vec<AddressObject>,
        entries: Vec<EntryObject>,
        loader: Loader,
    ) -> Self {
        Self {
            structure,
            addresses,
            entries,
            loader,
        }
    }

    /// The solved structure.
    pub const fn structure(&self) -> &Structure {
        &self.structure
    }

    /// Per-access values, in access order.
    pub fn address_objects(&self) -> &[AddressObject] {
        &self.addresses
    }

    /// Values of access `i`.
    pub fn address_object(&self, i: usize) -> &AddressObject {
        &self.addresses[i]
    }

    /// Every allocated entry, auxiliary ones included.
    pub fn entries(&self) -> &[EntryObject] {
        &self.entries
    }

    /// Entries of `buffer`.
    pub fn entries_of(&self, buffer: BufferId) -> impl Iterator<Item = &EntryObject> {
        self.entries.iter().filter(move |e| e.buffer() == buffer)
    }

    /// Entries keyed by the lookup that allocated them and their id.
    pub fn entry_map(&self) -> BTreeMap<(BufferAccess, u64), &EntryObject> {
        self.entries.iter().map(|e| ((e.access(), e.id()), e)).collect()
    }

    /// Preparation loads.
    pub const fn loader(&self) -> &Loader {
        &self.loader
    }
}

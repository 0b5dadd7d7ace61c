//! Per-access solved values.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::access::path::{AddressInstance, BufferAccess};
use crate::common::serde_pairs;
use crate::symbolic::formula::SymVar;

/// Concrete values of one access: its addresses, the entries it uses and every variable
/// of its path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressObject {
    #[serde(serialize_with = "serde_pairs::serialize")]
    addresses: BTreeMap<AddressInstance, u64>,
    #[serde(serialize_with = "serde_pairs::serialize")]
    entries: BTreeMap<BufferAccess, usize>,
    #[serde(serialize_with = "serde_pairs::serialize")]
    values: BTreeMap<SymVar, u64>,
}

impl AddressObject {
    /// Creates an empty object.
    pub const fn new() -> Self {
        Self {
            addresses: BTreeMap::new(),
            entries: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }

    /// Value of every address instance.
    pub const fn addresses(&self) -> &BTreeMap<AddressInstance, u64> {
        &self.addresses
    }

    /// Value of `instance`, if solved.
    pub fn address(&self, instance: &AddressInstance) -> Option<u64> {
        self.addresses.get(instance).copied()
    }

    /// Sets the value of `instance`.
    pub fn set_address(&mut self, instance: AddressInstance, value: u64) {
        let _ = self.addresses.insert(instance, value);
    }

    /// Entry (index into the solution's entries) used by each lookup.
    pub const fn entries(&self) -> &BTreeMap<BufferAccess, usize> {
        &self.entries
    }

    /// Entry used by `lookup`, if any.
    pub fn entry(&self, lookup: &BufferAccess) -> Option<usize> {
        self.entries.get(lookup).copied()
    }

    /// Binds `lookup` to an entry.
    pub fn set_entry(&mut self, lookup: BufferAccess, entry: usize) {
        let _ = self.entries.insert(lookup, entry);
    }

    /// Solved value of every variable of the access.
    pub const fn values(&self) -> &BTreeMap<SymVar, u64> {
        &self.values
    }

    /// Replaces the solved variable values.
    pub fn set_values(&mut self, values: BTreeMap<SymVar, u64>) {
        self.values = values;
    }
}

//! Dependencies between accesses and their per-access union.
//!
//! A [`Dependency`] collects the hazards between two accesses `i < j`. For the solver, the
//! dependencies of access `j` on all earlier accesses are regrouped into a
//! [`UnitedDependency`]: per buffer access of `j`, per hazard type, the ordered set of
//! `(source index, hazard)` pairs.

use std::collections::{BTreeMap, BTreeSet};

use super::hazard::{Hazard, HazardType};
use super::path::{AccessPath, BufferAccess};

/// Hazards between two accesses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Dependency {
    hazards: Vec<Hazard>,
}

impl Dependency {
    /// A dependency without hazards.
    pub const fn new() -> Self {
        Self {
            hazards: Vec::new(),
        }
    }

    /// Creates a dependency from hazards.
    pub const fn from_hazards(hazards: Vec<Hazard>) -> Self {
        Self { hazards }
    }

    /// The hazards.
    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    /// Returns whether there is no hazard.
    pub fn is_empty(&self) -> bool {
        self.hazards.is_empty()
    }

    /// A copy with `hazard` added.
    #[must_use]
    pub fn with(&self, hazard: Hazard) -> Self {
        let mut hazards = self.hazards.clone();
        hazards.push(hazard);
        Self { hazards }
    }

    /// Hazard on the secondary lookup `access`, if any.
    pub fn hazard_on(&self, access: &BufferAccess) -> Option<&Hazard> {
        self.hazards.iter().find(|h| h.secondary == *access)
    }
}

/// Relations of one buffer access of `j` with earlier accesses, per hazard type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitedHazard {
    relations: BTreeMap<HazardType, BTreeSet<(usize, Hazard)>>,
}

impl UnitedHazard {
    fn add(&mut self, source: usize, hazard: Hazard) {
        let _ = self.relations.entry(hazard.ty).or_default().insert((source, hazard));
    }

    /// Relations of type `ty`, ordered by source index.
    pub fn relation(&self, ty: HazardType) -> impl Iterator<Item = &(usize, Hazard)> {
        self.relations.get(&ty).into_iter().flatten()
    }

    /// Number of relations of type `ty`.
    pub fn count(&self, ty: HazardType) -> usize {
        self.relations.get(&ty).map_or(0, BTreeSet::len)
    }

    /// Returns whether there is a relation of type `ty`.
    pub fn has(&self, ty: HazardType) -> bool {
        self.count(ty) > 0
    }

    /// Hazard types present.
    pub fn types(&self) -> impl Iterator<Item = HazardType> + '_ {
        self.relations.keys().copied()
    }

    /// Relations implying equal indices, ordered by source index.
    pub fn index_equal_relation(&self) -> BTreeSet<(usize, Hazard)> {
        self.relations
            .iter()
            .filter(|(ty, _)| ty.is_index_equal())
            .flat_map(|(_, r)| r.iter().copied())
            .collect()
    }

    /// The earliest TAG_REPLACED relation.
    pub fn tag_replaced(&self) -> Option<&(usize, Hazard)> {
        self.relation(HazardType::TagReplaced).next()
    }
}

/// Hazards of access `j` with all earlier accesses, grouped per buffer access of `j`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitedDependency {
    hazards: BTreeMap<BufferAccess, UnitedHazard>,
    children: BTreeMap<BufferAccess, Vec<BufferAccess>>,
}

impl UnitedDependency {
    /// Unites the dependencies `(i, j)` for every `i < j`.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of access `j` (used to relate views to their parents).
    /// * `dependencies` - Pairs `(i, dependency(i, j))`.
    pub fn new<'a>(
        path: &AccessPath,
        dependencies: impl IntoIterator<Item = (usize, &'a Dependency)>,
    ) -> Self {
        let mut hazards: BTreeMap<BufferAccess, UnitedHazard> = BTreeMap::new();
        for (i, dependency) in dependencies {
            for h in dependency.hazards() {
                hazards.entry(h.secondary).or_default().add(i, *h);
            }
        }
        let children = path
            .buffer_reads()
            .iter()
            .map(|a| (*a, path.child_accesses(a)))
            .filter(|(_, c)| !c.is_empty())
            .collect();
        Self { hazards, children }
    }

    /// United hazards per buffer access.
    pub fn buffer_hazards(&self) -> impl Iterator<Item = (&BufferAccess, &UnitedHazard)> {
        self.hazards.iter()
    }

    /// United hazard of `access`, if it has any relation.
    pub fn hazard(&self, access: &BufferAccess) -> Option<&UnitedHazard> {
        self.hazards.get(access)
    }

    /// Relations of type `ty` on `access`.
    pub fn relation(&self, access: &BufferAccess, ty: HazardType) -> Vec<(usize, Hazard)> {
        self.hazard(access)
            .map(|u| u.relation(ty).copied().collect())
            .unwrap_or_default()
    }

    /// TAG_EQUAL relations on `access` and on the views of `access`.
    pub fn tag_equal_relation(&self, access: &BufferAccess) -> BTreeSet<(usize, Hazard)> {
        let mut relation: BTreeSet<_> = self.relation(access, HazardType::TagEqual).into_iter().collect();
        for child in self.children.get(access).into_iter().flatten() {
            relation.extend(self.relation(child, HazardType::TagEqual));
        }
        relation
    }

    /// Relations implying equal indices on `access`.
    pub fn index_equal_relation(&self, access: &BufferAccess) -> BTreeSet<(usize, Hazard)> {
        self.hazard(access)
            .map(UnitedHazard::index_equal_relation)
            .unwrap_or_default()
    }

    /// The TAG_REPLACED relation on `access`, if any.
    pub fn tag_replaced_relation(&self, access: &BufferAccess) -> Option<(usize, Hazard)> {
        self.hazard(access).and_then(|u| u.tag_replaced().copied())
    }

    /// TAG_NOT_EQUAL relations on `access`.
    pub fn tag_not_equal_relation(&self, access: &BufferAccess) -> Vec<(usize, Hazard)> {
        self.relation(access, HazardType::TagNotEqual)
    }

    /// INDEX_NOT_EQUAL relations on `access`.
    pub fn index_not_equal_relation(&self, access: &BufferAccess) -> Vec<(usize, Hazard)> {
        self.relation(access, HazardType::IndexNotEqual)
    }

    /// Returns whether a view of `access` has a TAG_REPLACED relation.
    pub fn child_tag_replaced(&self, access: &BufferAccess) -> bool {
        self.children
            .get(access)
            .into_iter()
            .flatten()
            .any(|c| self.tag_replaced_relation(c).is_some())
    }
}

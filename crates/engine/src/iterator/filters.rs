//! Structural filters.
//!
//! A filter is a predicate over part of a structure; a structure passes when every
//! registered filter accepts every part it looks at. Six kinds exist, by the part they see:
//! accesses, hazards, dependencies, united hazards (one lookup of access `j` against all
//! earlier accesses), united dependencies and whole structures.
//!
//! The built-in filters reject hazard combinations that no buffer state can realize.

use std::fmt;
use std::sync::Arc;

use crate::access::dependency::{Dependency, UnitedDependency, UnitedHazard};
use crate::access::hazard::{Hazard, HazardCondition, HazardType};
use crate::access::memory_access::Access;
use crate::access::path::BufferAccess;
use crate::access::structure::Structure;
use crate::model::{BufferEvent, BufferId, Subsystem};

/// Predicate over one access.
pub type AccessFilter = Arc<dyn Fn(&Subsystem, &Access) -> bool + Send + Sync>;
/// Predicate over one hazard between accesses `i < j`.
pub type HazardFilter = Arc<dyn Fn(&Subsystem, &Access, &Access, &Hazard) -> bool + Send + Sync>;
/// Predicate over the dependency between accesses `i < j`.
pub type DependencyFilter =
    Arc<dyn Fn(&Subsystem, &Access, &Access, &Dependency) -> bool + Send + Sync>;
/// Predicate over the relations of one lookup of access `j`.
pub type UnitedHazardFilter =
    Arc<dyn Fn(&Subsystem, &Access, &BufferAccess, &UnitedHazard) -> bool + Send + Sync>;
/// Predicate over every relation of access `j`.
pub type UnitedDependencyFilter =
    Arc<dyn Fn(&Subsystem, &Access, &UnitedDependency) -> bool + Send + Sync>;
/// Predicate over a whole structure.
pub type StructureFilter = Arc<dyn Fn(&Subsystem, &Structure) -> bool + Send + Sync>;

/// A set of filters of every kind.
#[derive(Clone, Default)]
pub struct FilterBuilder {
    access: Vec<AccessFilter>,
    hazard: Vec<HazardFilter>,
    dependency: Vec<DependencyFilter>,
    united_hazard: Vec<UnitedHazardFilter>,
    united_dependency: Vec<UnitedDependencyFilter>,
    structure: Vec<StructureFilter>,
}

impl fmt::Debug for FilterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterBuilder")
            .field("access", &self.access.len())
            .field("hazard", &self.hazard.len())
            .field("dependency", &self.dependency.len())
            .field("united_hazard", &self.united_hazard.len())
            .field("united_dependency", &self.united_dependency.len())
            .field("structure", &self.structure.len())
            .finish()
    }
}

impl FilterBuilder {
    /// An empty set accepting everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in filters applied to every pair of accesses.
    pub fn pair_defaults() -> Self {
        let mut filters = Self::new();
        filters.add_access_filter(parent_miss_child_hit);
        filters.add_hazard_filter(non_replaceable_tag_equal);
        filters.add_united_hazard_filter(hit_and_tag_replaced);
        filters.add_united_hazard_filter(tag_equal_and_tag_replaced);
        filters.add_united_hazard_filter(multiple_tag_replaced);
        filters.add_structure_filter(unclosed_equal_relations);
        filters
    }

    /// Built-in filters applied to whole structures.
    pub fn structure_defaults() -> Self {
        let mut filters = Self::pair_defaults();
        filters.add_structure_filter(access_then_miss);
        filters
    }

    /// Registers an access filter.
    pub fn add_access_filter(&mut self, f: impl Fn(&Subsystem, &Access) -> bool + Send + Sync + 'static) {
        self.access.push(Arc::new(f));
    }

    /// Registers a hazard filter.
    pub fn add_hazard_filter(
        &mut self,
        f: impl Fn(&Subsystem, &Access, &Access, &Hazard) -> bool + Send + Sync + 'static,
    ) {
        self.hazard.push(Arc::new(f));
    }

    /// Registers a dependency filter.
    pub fn add_dependency_filter(
        &mut self,
        f: impl Fn(&Subsystem, &Access, &Access, &Dependency) -> bool + Send + Sync + 'static,
    ) {
        self.dependency.push(Arc::new(f));
    }

    /// Registers a united-hazard filter.
    pub fn add_united_hazard_filter(
        &mut self,
        f: impl Fn(&Subsystem, &Access, &BufferAccess, &UnitedHazard) -> bool + Send + Sync + 'static,
    ) {
        self.united_hazard.push(Arc::new(f));
    }

    /// Registers a united-dependency filter.
    pub fn add_united_dependency_filter(
        &mut self,
        f: impl Fn(&Subsystem, &Access, &UnitedDependency) -> bool + Send + Sync + 'static,
    ) {
        self.united_dependency.push(Arc::new(f));
    }

    /// Registers a structure filter.
    pub fn add_structure_filter(&mut self, f: impl Fn(&Subsystem, &Structure) -> bool + Send + Sync + 'static) {
        self.structure.push(Arc::new(f));
    }

    /// Adds every filter of `other`.
    pub fn extend(&mut self, other: &Self) {
        self.access.extend(other.access.iter().cloned());
        self.hazard.extend(other.hazard.iter().cloned());
        self.dependency.extend(other.dependency.iter().cloned());
        self.united_hazard.extend(other.united_hazard.iter().cloned());
        self.united_dependency.extend(other.united_dependency.iter().cloned());
        self.structure.extend(other.structure.iter().cloned());
    }

    /// Returns whether `structure` passes every filter.
    pub fn test(&self, subsystem: &Subsystem, structure: &Structure) -> bool {
        let accesses = structure.accesses();
        if !accesses
            .iter()
            .all(|a| self.access.iter().all(|f| f(subsystem, a)))
        {
            return false;
        }
        for (&(i, j), dependency) in structure.dependencies() {
            let (a, b) = (&accesses[i], &accesses[j]);
            let hazards_pass = dependency
                .hazards()
                .iter()
                .all(|h| self.hazard.iter().all(|f| f(subsystem, a, b, h)));
            if !hazards_pass || !self.dependency.iter().all(|f| f(subsystem, a, b, dependency)) {
                return false;
            }
        }
        if !self.united_hazard.is_empty() || !self.united_dependency.is_empty() {
            for (j, access) in accesses.iter().enumerate() {
                let united = structure.united_dependency(j);
                let hazards_pass = united.buffer_hazards().all(|(lookup, hazard)| {
                    self.united_hazard.iter().all(|f| f(subsystem, access, lookup, hazard))
                });
                if !hazards_pass || !self.united_dependency.iter().all(|f| f(subsystem, access, &united)) {
                    return false;
                }
            }
        }
        self.structure.iter().all(|f| f(subsystem, structure))
    }
}

/// A tag-equal pair of lookups of a non-replaceable buffer shares one entry, so both
/// lookups hit or both miss.
pub fn non_replaceable_tag_equal(subsystem: &Subsystem, _: &Access, _: &Access, hazard: &Hazard) -> bool {
    if hazard.ty != HazardType::TagEqual || subsystem.buffer(hazard.buffer()).replaceable {
        return true;
    }
    hazard.primary.event.resolved() == hazard.secondary.event.resolved()
}

/// A replaced tag is absent, so the lookup cannot hit.
pub fn hit_and_tag_replaced(_: &Subsystem, _: &Access, lookup: &BufferAccess, hazard: &UnitedHazard) -> bool {
    !(lookup.event.resolved() == BufferEvent::Hit && hazard.has(HazardType::TagReplaced))
}

/// A tag cannot be both loaded by one access and evicted by another.
pub fn tag_equal_and_tag_replaced(_: &Subsystem, _: &Access, _: &BufferAccess, hazard: &UnitedHazard) -> bool {
    !(hazard.has(HazardType::TagEqual) && hazard.has(HazardType::TagReplaced))
}

/// A lookup's tag is evicted by at most one earlier miss.
pub fn multiple_tag_replaced(_: &Subsystem, _: &Access, _: &BufferAccess, hazard: &UnitedHazard) -> bool {
    hazard.count(HazardType::TagReplaced) <= 1
}

/// A view holds a subset of its parent: a view hit cannot go with a parent miss.
pub fn parent_miss_child_hit(_: &Subsystem, access: &Access) -> bool {
    let path = access.path();
    !path.buffer_checks().iter().any(|c| {
        c.event == BufferEvent::Hit
            && path
                .parent_access(c)
                .is_some_and(|p| p.event == BufferEvent::Miss)
    })
}

/// Once an access brought a tag into a replaceable buffer, a later tag-equal lookup
/// cannot miss.
pub fn access_then_miss(subsystem: &Subsystem, structure: &Structure) -> bool {
    !structure.dependencies().values().flat_map(Dependency::hazards).any(|h| {
        h.ty == HazardType::TagEqual
            && h.secondary.event == BufferEvent::Miss
            && subsystem.buffer(h.buffer()).replaceable
    })
}

/// Equal-index and equal-tag relations are transitive: among three lookups of a buffer,
/// exactly one "different" relation is contradictory.
pub fn unclosed_equal_relations(_: &Subsystem, structure: &Structure) -> bool {
    type Node = (usize, BufferAccess);
    let mut relations: Vec<(Node, Node, HazardCondition)> = Vec::new();
    for (&(i, j), dependency) in structure.dependencies() {
        for h in dependency.hazards() {
            relations.push(((i, h.primary), (j, h.secondary), h.condition));
        }
    }
    let condition = |x: &Node, y: &Node| {
        relations
            .iter()
            .find(|(a, b, _)| (a == x && b == y) || (a == y && b == x))
            .map(|(_, _, c)| *c)
    };
    let mut nodes: Vec<(BufferId, Node)> = relations
        .iter()
        .flat_map(|(a, b, _)| [(a.1.buffer, *a), (b.1.buffer, *b)])
        .collect();
    nodes.sort_unstable();
    nodes.dedup();
    for (p, &(buffer, x)) in nodes.iter().enumerate() {
        for (q, &(_, y)) in nodes.iter().enumerate().skip(p + 1).filter(|(_, n)| n.0 == buffer) {
            for &(_, z) in nodes.iter().skip(q + 1).filter(|n| n.0 == buffer) {
                if x.0 == y.0 || y.0 == z.0 || x.0 == z.0 {
                    continue;
                }
                let (Some(xy), Some(yz), Some(xz)) = (condition(&x, &y), condition(&y, &z), condition(&x, &z))
                else {
                    continue;
                };
                if !closed(xy.index, yz.index, xz.index) {
                    return false;
                }
                let same_set = [xy.index, yz.index, xz.index].iter().all(|c| *c != Some(false));
                if same_set && !closed(xy.tag, yz.tag, xz.tag) {
                    return false;
                }
            }
        }
    }
    true
}

/// Three pairwise relations are consistent unless exactly one of them is "different".
fn closed(a: Option<bool>, b: Option<bool>, c: Option<bool>) -> bool {
    match (a, b, c) {
        (Some(a), Some(b), Some(c)) => [a, b, c].iter().filter(|equal| !**equal).count() != 1,
        _ => true,
    }
}

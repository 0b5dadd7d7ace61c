//! Structures: accesses plus their dependency matrix.

use std::collections::BTreeMap;
use std::fmt;

use super::dependency::{Dependency, UnitedDependency};
use super::memory_access::Access;
use crate::common::{Error, Result};

/// `N` accesses and the hazards between them.
///
/// The matrix is sparse: only pairs `(i, j)` with `i < j` and at least one hazard are
/// stored; every other pair has no dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Structure {
    accesses: Vec<Access>,
    dependencies: BTreeMap<(usize, usize), Dependency>,
}

impl Structure {
    /// Creates a structure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedStructure`] when a key is not `(i, j)` with `i < j < N`.
    pub fn new(accesses: Vec<Access>, dependencies: BTreeMap<(usize, usize), Dependency>) -> Result<Self> {
        for &(i, j) in dependencies.keys() {
            if i >= j || j >= accesses.len() {
                return Err(Error::MalformedStructure(format!(
                    "dependency ({i}, {j}) for {} accesses",
                    accesses.len()
                )));
            }
        }
        let dependencies = dependencies.into_iter().filter(|(_, d)| !d.is_empty()).collect();
        Ok(Self {
            accesses,
            dependencies,
        })
    }

    /// Creates a structure from a matrix whose keys are known to be well formed.
    pub(crate) fn from_parts(accesses: Vec<Access>, dependencies: BTreeMap<(usize, usize), Dependency>) -> Self {
        debug_assert!(dependencies.keys().all(|&(i, j)| i < j && j < accesses.len()));
        Self {
            accesses,
            dependencies: dependencies.into_iter().filter(|(_, d)| !d.is_empty()).collect(),
        }
    }

    /// Creates a two-access structure.
    pub fn pair(first: Access, second: Access, dependency: Dependency) -> Self {
        let mut dependencies = BTreeMap::new();
        if !dependency.is_empty() {
            let _ = dependencies.insert((0, 1), dependency);
        }
        Self {
            accesses: vec![first, second],
            dependencies,
        }
    }

    /// Number of accesses.
    pub fn len(&self) -> usize {
        self.accesses.len()
    }

    /// Returns whether the structure has no access.
    pub fn is_empty(&self) -> bool {
        self.accesses.is_empty()
    }

    /// The accesses in order.
    pub fn accesses(&self) -> &[Access] {
        &self.accesses
    }

    /// Access `i`.
    pub fn access(&self, i: usize) -> &Access {
        &self.accesses[i]
    }

    /// Dependency of `j` on `i`; nothing for `i >= j` or a hazard-free pair.
    pub fn dependency(&self, i: usize, j: usize) -> Option<&Dependency> {
        if i >= j {
            return None;
        }
        self.dependencies.get(&(i, j))
    }

    /// All non-empty dependencies.
    pub const fn dependencies(&self) -> &BTreeMap<(usize, usize), Dependency> {
        &self.dependencies
    }

    /// Dependencies of `j` on every earlier access, united per buffer access of `j`.
    pub fn united_dependency(&self, j: usize) -> UnitedDependency {
        UnitedDependency::new(
            self.accesses[j].path(),
            (0..j).filter_map(|i| self.dependency(i, j).map(|d| (i, d))),
        )
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, a) in self.accesses.iter().enumerate() {
            writeln!(f, "{i}: {a}")?;
        }
        for ((i, j), d) in &self.dependencies {
            write!(f, "({i}, {j}):")?;
            for h in d.hazards() {
                write!(f, " {h}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

//! Configuration for the generation engine.
//!
//! This module defines the structures that parameterize a generation run. It provides:
//! 1. **Defaults:** Baseline constants (page mask, seed, path and allocator bounds).
//! 2. **Generator settings:** Memory regions, page mask and preferred alignment.
//! 3. **Engine configuration:** Iteration mode, classifier, limits and seed.
//! 4. **Access constraints:** Buffer-event allow-lists and integer constraints on variables.
//!
//! Every structure deserializes from JSON with defaults for omitted fields, or use
//! `Default::default()` programmatically.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::common::{DataType, Error, Result};
use crate::model::{BufferEvent, BufferId, Subsystem, VarId};

/// Default configuration constants for the engine.
mod defaults {
    /// Page mask tying the low bits of virtual and physical addresses (4 KiB pages).
    pub const PAGE_MASK: u64 = 0x0fff;

    /// Seed of the engine's randomizer.
    pub const SEED: u64 = 123456789;

    /// Maximum number of transitions on one extracted path.
    ///
    /// Bounds the depth-first search on graphs with cycles.
    pub const MAX_PATH_DEPTH: usize = 64;

    /// Maximum number of paths extracted per access type.
    pub const MAX_PATHS: usize = 4096;

    /// Number of candidate values in an address allocation pool.
    pub const ALLOC_TABLE_SIZE: usize = 64;

    /// Whether a region takes part in address selection.
    pub const REGION_ENABLED: bool = true;
}

/// Kind of memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// A segment of the virtual address space.
    Virtual,
    /// A region of physical memory.
    Physical,
}

/// A bounded address range addresses may be drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSettings {
    /// Region name, matched against transition region restrictions.
    pub name: String,
    /// Virtual segment or physical region.
    pub kind: RegionKind,
    /// Lowest address (inclusive).
    pub min: u64,
    /// Highest address (inclusive).
    pub max: u64,
    /// Whether the region is used.
    #[serde(default = "GeneratorSettings::default_region_enabled")]
    pub enabled: bool,
}

impl RegionSettings {
    /// Creates an enabled region.
    pub fn new(name: impl Into<String>, kind: RegionKind, min: u64, max: u64) -> Self {
        Self {
            name: name.into(),
            kind,
            min,
            max,
            enabled: defaults::REGION_ENABLED,
        }
    }

    /// Returns whether `address` lies within the region.
    pub const fn contains(&self, address: u64) -> bool {
        self.min <= address && address <= self.max
    }
}

/// Settings of the memory layout the generated accesses must respect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// Virtual segments and physical regions.
    #[serde(default)]
    pub regions: Vec<RegionSettings>,
    /// Bits shared by a virtual address and its translation.
    #[serde(default = "GeneratorSettings::default_page_mask")]
    pub page_mask: u64,
    /// Preferred alignment, applied on top of the natural alignment of each access.
    #[serde(default)]
    pub align: Option<DataType>,
}

impl GeneratorSettings {
    const fn default_page_mask() -> u64 {
        defaults::PAGE_MASK
    }

    const fn default_region_enabled() -> bool {
        defaults::REGION_ENABLED
    }

    /// Enabled regions of `kind`.
    pub fn enabled_regions(&self, kind: RegionKind) -> impl Iterator<Item = &RegionSettings> {
        self.regions.iter().filter(move |r| r.enabled && r.kind == kind)
    }

    /// Checks that every region is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an empty range or duplicate names.
    pub fn validate(&self) -> Result<()> {
        let mut names = BTreeSet::new();
        for r in &self.regions {
            if r.min > r.max {
                return Err(Error::InvalidConfig(format!(
                    "region `{}` has min {:#x} above max {:#x}",
                    r.name, r.min, r.max
                )));
            }
            if !names.insert(r.name.as_str()) {
                return Err(Error::InvalidConfig(format!("duplicate region `{}`", r.name)));
            }
        }
        Ok(())
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            page_mask: defaults::PAGE_MASK,
            align: None,
        }
    }
}

/// How the structure iterator walks path classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationMode {
    /// One random representative per class, one dependency per class combination.
    #[default]
    Random,
    /// Every path of every class and every dependency combination.
    Exhaustive,
}

/// Equivalence relation used to group extracted paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classifier {
    /// Every path is its own class.
    Trivial,
    /// Paths with the same sequence of buffer events are equivalent.
    #[default]
    BufferEvents,
    /// Paths touching the same set of buffers are equivalent.
    Buffers,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Iteration mode.
    #[serde(default)]
    pub mode: IterationMode,
    /// Path classifier.
    #[serde(default)]
    pub classifier: Classifier,
    /// Maximum number of solutions the engine produces (`None` = until exhausted).
    ///
    /// A bare structure iterator counts the structures it yields instead.
    #[serde(default)]
    pub count_limit: Option<usize>,
    /// Randomizer seed.
    #[serde(default = "EngineConfig::default_seed")]
    pub seed: u64,
    /// Maximum number of transitions on one path.
    #[serde(default = "EngineConfig::default_max_path_depth")]
    pub max_path_depth: usize,
    /// Maximum number of paths extracted per access type.
    #[serde(default = "EngineConfig::default_max_paths")]
    pub max_paths: usize,
    /// Size of the candidate pool of the address allocator.
    #[serde(default = "EngineConfig::default_alloc_table_size")]
    pub alloc_table_size: usize,
}

impl EngineConfig {
    const fn default_seed() -> u64 {
        defaults::SEED
    }

    const fn default_max_path_depth() -> usize {
        defaults::MAX_PATH_DEPTH
    }

    const fn default_max_paths() -> usize {
        defaults::MAX_PATHS
    }

    const fn default_alloc_table_size() -> usize {
        defaults::ALLOC_TABLE_SIZE
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: IterationMode::default(),
            classifier: Classifier::default(),
            count_limit: None,
            seed: defaults::SEED,
            max_path_depth: defaults::MAX_PATH_DEPTH,
            max_paths: defaults::MAX_PATHS,
            alloc_table_size: defaults::ALLOC_TABLE_SIZE,
        }
    }
}

/// Constraint on the values of one variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegerConstraintKind {
    /// `min <= var <= max`.
    Range {
        /// Lower bound (inclusive).
        min: u64,
        /// Upper bound (inclusive).
        max: u64,
    },
    /// `var` is one of `values`.
    Retain {
        /// Allowed values.
        values: Vec<u64>,
    },
    /// `var` is none of `values`.
    Exclude {
        /// Forbidden values.
        values: Vec<u64>,
    },
}

/// Integer constraint on a named variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerConstraint {
    /// Variable name.
    pub variable: String,
    /// Allowed values.
    #[serde(flatten)]
    pub kind: IntegerConstraintKind,
}

impl IntegerConstraint {
    /// `min <= variable <= max`.
    pub fn range(variable: impl Into<String>, min: u64, max: u64) -> Self {
        Self {
            variable: variable.into(),
            kind: IntegerConstraintKind::Range { min, max },
        }
    }

    /// `variable` is one of `values`.
    pub fn retain(variable: impl Into<String>, values: Vec<u64>) -> Self {
        Self {
            variable: variable.into(),
            kind: IntegerConstraintKind::Retain { values },
        }
    }

    /// `variable` is none of `values`.
    pub fn exclude(variable: impl Into<String>, values: Vec<u64>) -> Self {
        Self {
            variable: variable.into(),
            kind: IntegerConstraintKind::Exclude { values },
        }
    }

    /// Resolves the constrained variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownName`] when the variable does not exist.
    pub fn resolve(&self, subsystem: &Subsystem) -> Result<VarId> {
        subsystem
            .variable_by_name(&self.variable)
            .ok_or_else(|| Error::UnknownName {
                kind: "variable",
                name: self.variable.clone(),
            })
    }
}

/// User constraints restricting the accesses of a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryAccessConstraints {
    /// Allowed events per buffer name; buffers not listed allow every event.
    #[serde(default)]
    pub events: BTreeMap<String, BTreeSet<BufferEvent>>,
    /// Integer constraints on variables.
    #[serde(default)]
    pub integers: Vec<IntegerConstraint>,
}

impl MemoryAccessConstraints {
    /// Restricts `buffer` to `events`.
    #[must_use]
    pub fn with_events(
        mut self,
        buffer: impl Into<String>,
        events: impl IntoIterator<Item = BufferEvent>,
    ) -> Self {
        let _ = self.events.insert(buffer.into(), events.into_iter().collect());
        self
    }

    /// Adds an integer constraint.
    #[must_use]
    pub fn with_integer(mut self, constraint: IntegerConstraint) -> Self {
        self.integers.push(constraint);
        self
    }

    /// Returns whether `event` is allowed on `buffer`.
    pub fn allows(&self, subsystem: &Subsystem, buffer: BufferId, event: BufferEvent) -> bool {
        self.events
            .get(&subsystem.buffer(buffer).name)
            .is_none_or(|allowed| allowed.contains(&event))
    }

    /// Combines two constraint sets; event allow-lists on the same buffer intersect.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut events = self.events.clone();
        for (name, allowed) in &other.events {
            let _ = events
                .entry(name.clone())
                .and_modify(|mine| mine.retain(|e| allowed.contains(e)))
                .or_insert_with(|| allowed.clone());
        }
        let mut integers = self.integers.clone();
        integers.extend(other.integers.iter().cloned());
        Self { events, integers }
    }

    /// Checks that every referenced buffer and variable exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownName`] for an unknown buffer or variable.
    pub fn validate(&self, subsystem: &Subsystem) -> Result<()> {
        for name in self.events.keys() {
            if subsystem.buffer_by_name(name).is_none() {
                return Err(Error::UnknownName {
                    kind: "buffer",
                    name: name.clone(),
                });
            }
        }
        for c in &self.integers {
            let _ = c.resolve(subsystem)?;
        }
        Ok(())
    }
}

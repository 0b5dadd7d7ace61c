//! Structure iterator.
//!
//! Enumerates candidate structures as a product of per-access path choices (see
//! [`ClassIterator`]) and per-pair dependency choices:
//! 1. **Pair candidates:** For each pair `i < j`, every lookup pair on a shared buffer
//!    receives one structurally possible hazard. Partial dependencies are checked as
//!    two-access structures and pruned as soon as they fail.
//! 2. **Matrix:** One candidate per pair, the dependency indices advancing fastest.
//! 3. **Acceptance:** Whole-structure filters and a satisfiability check.
//!
//! A pair sharing no buffer has the empty dependency only. In random mode one structure
//! is accepted per path combination, and the class combinations restart while a count
//! limit is pending and the last round produced something.
//!
//! The count limit bounds the structures that are accepted and kept: a consumer that
//! cannot use the current structure calls [`StructureIterator::reject`] before moving on,
//! so the rejected structure does not count.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use super::checker::StructureChecker;
use super::classes::ClassIterator;
use super::filters::FilterBuilder;
use super::Cursor;
use crate::access::dependency::Dependency;
use crate::access::memory_access::Access;
use crate::access::path::AccessPath;
use crate::access::structure::Structure;
use crate::common::{AccessType, Randomizer, Result};
use crate::config::{EngineConfig, IterationMode, MemoryAccessConstraints};
use crate::coverage::{classify, possible_hazards, PathExtractor};
use crate::model::Subsystem;

/// Counters of a structure iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IteratorStats {
    /// Path combinations visited.
    pub combinations: usize,
    /// Complete structures checked.
    pub candidates: usize,
    /// Structures accepted.
    pub accepted: usize,
    /// Accepted structures a consumer rejected.
    pub rejected: usize,
}

/// Cursor over feasible structures.
#[derive(Debug)]
pub struct StructureIterator {
    subsystem: Arc<Subsystem>,
    types: Vec<AccessType>,
    constraints: Vec<Arc<MemoryAccessConstraints>>,
    classes: ClassIterator,
    mode: IterationMode,
    count_limit: Option<usize>,
    rng: Randomizer,
    pair_filters: FilterBuilder,
    structure_filters: FilterBuilder,
    accesses: Vec<Access>,
    pairs: Vec<(usize, usize)>,
    candidates: Vec<Vec<Dependency>>,
    indices: Vec<usize>,
    loaded: bool,
    pending: bool,
    accepted_here: bool,
    accepted_this_round: usize,
    current: Option<Structure>,
    stopped: bool,
    stats: IteratorStats,
}

impl StructureIterator {
    /// Extracts and classifies the paths of every access and prepares the iteration.
    ///
    /// # Arguments
    ///
    /// * `subsystem` - Model to build structures on.
    /// * `accesses` - Access type and constraints of each access, in order.
    /// * `config` - Iteration mode, classifier, limits and seed.
    ///
    /// # Errors
    ///
    /// Returns an error when a constraint refers to an unknown buffer or variable.
    pub fn new(
        subsystem: Arc<Subsystem>,
        accesses: Vec<(AccessType, MemoryAccessConstraints)>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let extractor = PathExtractor::new(&subsystem, config.max_path_depth, config.max_paths);
        let mut extracted: Vec<(AccessType, Arc<MemoryAccessConstraints>, Vec<Vec<Arc<AccessPath>>>)> =
            Vec::new();
        let mut types = Vec::with_capacity(accesses.len());
        let mut constraints = Vec::with_capacity(accesses.len());
        let mut classes = Vec::with_capacity(accesses.len());
        for (ty, c) in accesses {
            let known = extracted.iter().find(|(t, k, _)| *t == ty && **k == c);
            let (shared, partition) = if let Some((_, k, p)) = known {
                (Arc::clone(k), p.clone())
            } else {
                let paths = extractor.extract(ty, &c)?;
                let partition = classify(config.classifier, &paths);
                debug!(access = %ty, paths = paths.len(), classes = partition.len(), "classified paths");
                let shared = Arc::new(c);
                extracted.push((ty, Arc::clone(&shared), partition.clone()));
                (shared, partition)
            };
            types.push(ty);
            constraints.push(shared);
            classes.push(partition);
        }
        Ok(Self {
            subsystem,
            types,
            constraints,
            classes: ClassIterator::new(classes, config.mode, Randomizer::new(config.seed)),
            mode: config.mode,
            count_limit: config.count_limit,
            rng: Randomizer::new(config.seed.rotate_left(32)),
            pair_filters: FilterBuilder::pair_defaults(),
            structure_filters: FilterBuilder::structure_defaults(),
            accesses: Vec::new(),
            pairs: Vec::new(),
            candidates: Vec::new(),
            indices: Vec::new(),
            loaded: false,
            pending: false,
            accepted_here: false,
            accepted_this_round: 0,
            current: None,
            stopped: false,
            stats: IteratorStats::default(),
        })
    }

    /// Adds filters applied to complete structures.
    pub fn add_filters(&mut self, filters: &FilterBuilder) {
        self.structure_filters.extend(filters);
    }

    /// Adds filters applied to pairs of accesses while dependencies are enumerated.
    pub fn add_pair_filters(&mut self, filters: &FilterBuilder) {
        self.pair_filters.extend(filters);
    }

    /// Counters since the last `init`.
    pub const fn stats(&self) -> IteratorStats {
        self.stats
    }

    /// The model structures are built on.
    pub fn subsystem(&self) -> &Subsystem {
        &self.subsystem
    }

    /// Marks the current structure as unusable downstream; it no longer counts toward the
    /// count limit or toward the progress of a random round.
    pub fn reject(&mut self) {
        if self.current.is_some() {
            self.stats.rejected += 1;
            self.accepted_this_round = self.accepted_this_round.saturating_sub(1);
        }
    }

    fn limit_reached(&self) -> bool {
        self.count_limit
            .is_some_and(|limit| self.stats.accepted - self.stats.rejected >= limit)
    }

    fn advance(&mut self) {
        self.current = None;
        loop {
            if self.stopped || self.limit_reached() {
                return;
            }
            let ready = if self.pending {
                self.pending = false;
                true
            } else {
                self.next_dependencies()
            };
            if !ready {
                if !self.next_combination() {
                    return;
                }
                continue;
            }
            self.stats.candidates += 1;
            let structure = self.assemble();
            if StructureChecker::new(&self.subsystem, &self.structure_filters).check(&structure) {
                self.stats.accepted += 1;
                self.accepted_here = true;
                self.accepted_this_round += 1;
                trace!(structure = %structure, "structure accepted");
                self.current = Some(structure);
                return;
            }
        }
    }

    /// Moves to the next dependency matrix of the current combination.
    fn next_dependencies(&mut self) -> bool {
        if !self.loaded || (self.mode == IterationMode::Random && self.accepted_here) {
            return false;
        }
        for p in (0..self.pairs.len()).rev() {
            self.indices[p] += 1;
            if self.indices[p] < self.candidates[p].len() {
                return true;
            }
            self.indices[p] = 0;
        }
        false
    }

    /// Moves to the next path combination with a candidate for every pair.
    fn next_combination(&mut self) -> bool {
        loop {
            if self.stopped {
                return false;
            }
            if !self.classes.has_value() {
                let restart = self.mode == IterationMode::Random
                    && self.count_limit.is_some()
                    && self.accepted_this_round > 0;
                if !restart {
                    self.loaded = false;
                    return false;
                }
                self.accepted_this_round = 0;
                self.classes.init();
                continue;
            }
            let paths = self.classes.value();
            self.classes.next();
            self.stats.combinations += 1;
            self.accesses = paths
                .into_iter()
                .zip(self.types.iter().zip(&self.constraints))
                .map(|(path, (ty, c))| Access::new(*ty, path, Arc::clone(c)))
                .collect();
            if self.prepare_dependencies() {
                self.indices = vec![0; self.pairs.len()];
                self.loaded = true;
                self.pending = true;
                self.accepted_here = false;
                return true;
            }
        }
    }

    fn prepare_dependencies(&mut self) -> bool {
        let n = self.accesses.len();
        self.pairs = (0..n).flat_map(|i| (i + 1..n).map(move |j| (i, j))).collect();
        self.candidates.clear();
        for p in 0..self.pairs.len() {
            let (i, j) = self.pairs[p];
            let mut candidates = self.pair_dependencies(i, j);
            if candidates.is_empty() {
                trace!(i, j, "no feasible dependency");
                return false;
            }
            if self.mode == IterationMode::Random {
                self.rng.shuffle(&mut candidates);
            }
            self.candidates.push(candidates);
        }
        true
    }

    /// Feasible dependencies between accesses `i < j`.
    fn pair_dependencies(&self, i: usize, j: usize) -> Vec<Dependency> {
        let subsystem: &Subsystem = &self.subsystem;
        let (first, second) = (&self.accesses[i], &self.accesses[j]);
        let checker = StructureChecker::new(subsystem, &self.pair_filters);
        let mut partial = vec![Dependency::new()];
        for primary in first.path().buffer_reads() {
            for secondary in second.path().buffer_reads() {
                if primary.buffer != secondary.buffer {
                    continue;
                }
                let hazards = possible_hazards(subsystem, primary, secondary);
                let mut extended = Vec::new();
                for dependency in &partial {
                    for hazard in &hazards {
                        let candidate = dependency.with(*hazard);
                        let pair = Structure::pair(first.clone(), second.clone(), candidate.clone());
                        if checker.check(&pair) {
                            extended.push(candidate);
                        }
                    }
                }
                partial = extended;
                if partial.is_empty() {
                    return partial;
                }
            }
        }
        partial
    }

    fn assemble(&self) -> Structure {
        let dependencies: BTreeMap<(usize, usize), Dependency> = self
            .pairs
            .iter()
            .zip(&self.indices)
            .enumerate()
            .map(|(p, (&pair, &k))| (pair, self.candidates[p][k].clone()))
            .collect();
        Structure::from_parts(self.accesses.clone(), dependencies)
    }
}

impl Cursor for StructureIterator {
    type Item = Structure;

    fn init(&mut self) {
        self.stats = IteratorStats::default();
        self.stopped = false;
        self.loaded = false;
        self.pending = false;
        self.accepted_this_round = 0;
        self.classes.init();
        self.advance();
    }

    fn has_value(&self) -> bool {
        self.current.is_some()
    }

    fn value(&self) -> Self::Item {
        self.current.clone().unwrap_or_default()
    }

    fn next(&mut self) {
        self.advance();
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.current = None;
        self.classes.stop();
    }
}

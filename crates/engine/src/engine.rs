//! Solution stream.
//!
//! [`MemoryEngine`] ties the pipeline together. It provides:
//! 1. **Extraction:** Feasible paths of every requested access, plus the plain byte-load
//!    paths the solver uses to fill entries only loads go through.
//! 2. **Iteration:** A [`StructureIterator`] over accepted structures.
//! 3. **Solving:** Each structure is handed to a fresh [`MemorySolver`]; unsatisfiable
//!    structures are rejected back to the iterator and skipped, so the count limit bounds
//!    solutions. The stream only reports exhaustion.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::access::path::AccessPath;
use crate::allocator::Allocators;
use crate::common::{AccessType, DataType, Randomizer, Result};
use crate::config::{EngineConfig, GeneratorSettings, MemoryAccessConstraints};
use crate::coverage::PathExtractor;
use crate::iterator::{Cursor, FilterBuilder, IteratorStats, StructureIterator, Values};
use crate::model::Subsystem;
use crate::solver::{MemorySolver, Solution, SolverResult};

/// Counters of a generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Structures handed to the solver.
    pub structures: usize,
    /// Structures solved.
    pub solved: usize,
    /// Structures the solver rejected.
    pub unsat: usize,
}

/// Forward-only stream of solutions for a sequence of accesses.
#[derive(Debug)]
pub struct MemoryEngine {
    subsystem: Arc<Subsystem>,
    settings: GeneratorSettings,
    normal_paths: Vec<Arc<AccessPath>>,
    structures: StructureIterator,
    allocators: Allocators,
    rng: Randomizer,
    current: Option<Solution>,
    stopped: bool,
    reported: bool,
    stats: EngineStats,
}

impl MemoryEngine {
    /// Prepares a generation run.
    ///
    /// # Arguments
    ///
    /// * `subsystem` - Model of the memory subsystem.
    /// * `settings` - Regions, page mask and alignment.
    /// * `config` - Iteration mode, classifier, limits and seed.
    /// * `accesses` - Access type and constraints of each access, in order.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings are malformed or a constraint refers to an
    /// unknown buffer or variable.
    pub fn new(
        subsystem: Arc<Subsystem>,
        settings: GeneratorSettings,
        config: &EngineConfig,
        accesses: Vec<(AccessType, MemoryAccessConstraints)>,
    ) -> Result<Self> {
        settings.validate()?;
        let normal_paths = PathExtractor::new(&subsystem, config.max_path_depth, config.max_paths)
            .extract(AccessType::load(DataType::Byte), &MemoryAccessConstraints::default())?;
        let structures = StructureIterator::new(Arc::clone(&subsystem), accesses, config)?;
        debug!(
            normal_paths = normal_paths.len(),
            regions = settings.regions.len(),
            "engine prepared"
        );
        Ok(Self {
            subsystem,
            settings,
            normal_paths,
            structures,
            allocators: Allocators::new(config.alloc_table_size),
            rng: Randomizer::new(config.seed),
            current: None,
            stopped: false,
            reported: false,
            stats: EngineStats::default(),
        })
    }

    /// Adds filters applied to complete structures; call before `init`.
    pub fn add_filters(&mut self, filters: &FilterBuilder) {
        self.structures.add_filters(filters);
    }

    /// Adds filters applied to access pairs; call before `init`.
    pub fn add_pair_filters(&mut self, filters: &FilterBuilder) {
        self.structures.add_pair_filters(filters);
    }

    /// Solver counters since the last `init`.
    pub const fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Structure iterator counters since the last `init`.
    pub const fn iterator_stats(&self) -> IteratorStats {
        self.structures.stats()
    }

    /// The model solutions are generated for.
    pub fn subsystem(&self) -> &Subsystem {
        &self.subsystem
    }

    /// The generator settings.
    pub const fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Initializes the engine and adapts it to [`Iterator`].
    pub fn solutions(self) -> Values<Self> {
        self.into_values()
    }

    fn advance(&mut self) {
        self.current = None;
        while !self.stopped && self.structures.has_value() {
            let structure = self.structures.value();
            self.stats.structures += 1;
            let result = MemorySolver::new(
                &self.subsystem,
                &self.settings,
                &self.normal_paths,
                &mut self.allocators,
                &mut self.rng,
            )
            .solve(&structure);
            match result {
                SolverResult::Sat(solution) => {
                    self.stats.solved += 1;
                    self.current = Some(solution);
                    self.structures.next();
                    return;
                }
                SolverResult::Unsat { reason } => {
                    self.stats.unsat += 1;
                    debug!(%reason, "structure skipped");
                    self.structures.reject();
                    self.structures.next();
                }
            }
        }
        if !self.reported {
            self.reported = true;
            let iterated = self.structures.stats();
            info!(
                combinations = iterated.combinations,
                candidates = iterated.candidates,
                accepted = iterated.accepted,
                rejected = iterated.rejected,
                solved = self.stats.solved,
                unsat = self.stats.unsat,
                "solution stream exhausted"
            );
        }
    }
}

impl Cursor for MemoryEngine {
    type Item = Solution;

    fn init(&mut self) {
        self.stats = EngineStats::default();
        self.stopped = false;
        self.reported = false;
        self.structures.init();
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
        self.structures.stop();
    }
}

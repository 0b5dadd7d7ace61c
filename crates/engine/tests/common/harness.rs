//! Solver harness and structure helpers.

use std::collections::BTreeMap;
use std::sync::Arc;

use mmutest_core::access::{Access, AccessPath, BufferAccess, Dependency, Hazard, HazardType, Structure};
use mmutest_core::allocator::Allocators;
use mmutest_core::common::{AccessType, DataType, Randomizer};
use mmutest_core::config::{EngineConfig, GeneratorSettings, IntegerConstraint, MemoryAccessConstraints};
use mmutest_core::coverage::PathExtractor;
use mmutest_core::model::{BufferEvent, BufferId, Subsystem};
use mmutest_core::solver::{MemorySolver, SolverResult};
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber once; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Byte load.
pub const LOAD: AccessType = AccessType::load(DataType::Byte);

/// Every feasible path of `ty`, unconstrained.
pub fn paths(subsystem: &Subsystem, ty: AccessType) -> Vec<Arc<AccessPath>> {
    let config = EngineConfig::default();
    PathExtractor::new(subsystem, config.max_path_depth, config.max_paths)
        .extract(ty, &MemoryAccessConstraints::default())
        .unwrap()
}

/// The byte-load path on which `buffer` sees `event`.
pub fn path_with(subsystem: &Subsystem, buffer: BufferId, event: BufferEvent) -> Arc<AccessPath> {
    paths(subsystem, LOAD)
        .into_iter()
        .find(|p| p.event(buffer) == Some(event))
        .unwrap()
}

/// The single lookup of `buffer` on `path`.
pub fn lookup(path: &AccessPath, buffer: BufferId) -> BufferAccess {
    *path.buffer_reads().iter().find(|r| r.buffer == buffer).unwrap()
}

/// A byte load on the path where `buffer` sees `event`.
pub fn access(subsystem: &Subsystem, buffer: BufferId, event: BufferEvent) -> Access {
    Access::unconstrained(LOAD, path_with(subsystem, buffer, event))
}

/// A byte load on the path where `buffer` sees `event`, at virtual address `va`.
pub fn access_at(subsystem: &Subsystem, buffer: BufferId, event: BufferEvent, va: u64) -> Access {
    let constraints = MemoryAccessConstraints::default().with_integer(IntegerConstraint::range("VA", va, va));
    Access::new(LOAD, path_with(subsystem, buffer, event), Arc::new(constraints))
}

/// Two accesses related by one hazard of type `ty` on `buffer`.
pub fn related(subsystem: &Subsystem, first: Access, second: Access, buffer: BufferId, ty: HazardType) -> Structure {
    let hazard = Hazard::new(
        subsystem,
        ty,
        lookup(first.path(), buffer),
        lookup(second.path(), buffer),
    );
    let mut dependencies = BTreeMap::new();
    let _ = dependencies.insert((0, 1), Dependency::from_hazards(vec![hazard]));
    Structure::new(vec![first, second], dependencies).unwrap()
}

/// State of a solver run: settings, plain load paths, allocators and randomizer.
#[derive(Debug)]
pub struct SolverContext {
    /// Model under test.
    pub subsystem: Arc<Subsystem>,
    /// Generator settings (no regions by default).
    pub settings: GeneratorSettings,
    normal_paths: Vec<Arc<AccessPath>>,
    allocators: Allocators,
    rng: Randomizer,
}

impl SolverContext {
    /// Creates a context seeded with `seed`.
    pub fn new(subsystem: Arc<Subsystem>, seed: u64) -> Self {
        init_tracing();
        let normal_paths = paths(&subsystem, LOAD);
        Self {
            subsystem,
            settings: GeneratorSettings::default(),
            normal_paths,
            allocators: Allocators::new(EngineConfig::default().alloc_table_size),
            rng: Randomizer::new(seed),
        }
    }

    /// Solves `structure` with a fresh solver.
    pub fn solve(&mut self, structure: &Structure) -> SolverResult {
        MemorySolver::new(
            &self.subsystem,
            &self.settings,
            &self.normal_paths,
            &mut self.allocators,
            &mut self.rng,
        )
        .solve(structure)
    }
}

//! Memory-access test sequence generation engine.
//!
//! This crate enumerates and solves memory-access scenarios for a declarative model of a
//! memory-management subsystem (caches, TLBs, page tables). It provides:
//! 1. **Model:** Variables, addresses, buffers and the guarded transition graph.
//! 2. **Access:** Access paths, accesses, hazards, dependencies and structures.
//! 3. **Symbolic:** Bit-field formulas, the symbolic executor and the bit-level solver.
//! 4. **Coverage:** Path extraction, path classification and hazard enumeration.
//! 5. **Iterator:** Filtered enumeration of multi-access structures.
//! 6. **Solver:** Address, entry and eviction-sequence resolution for one structure.
//! 7. **Engine:** The forward-only stream of solutions tying everything together.

/// Address and entry-id allocators.
pub mod allocator;
/// Access paths, accesses, hazards, dependencies and structures.
pub mod access;
/// Common types (errors, bit helpers, data types, randomizer).
pub mod common;
/// Generator settings, engine configuration and access constraints.
pub mod config;
/// Path extraction, classification and hazard enumeration.
pub mod coverage;
/// Top-level engine producing solutions.
pub mod engine;
/// Structure iteration, filters and feasibility checks.
pub mod iterator;
/// In-memory model of the memory subsystem.
pub mod model;
/// Structure solver (addresses, entries, loader).
pub mod solver;
/// Bit-field formulas and their execution and solving.
pub mod symbolic;

/// Precondition violation type returned by builders and constructors.
pub use crate::common::{Error, Result};
/// Main engine type; build with `MemoryEngine::new` and pull solutions through `Cursor`.
pub use crate::engine::MemoryEngine;
/// Forward-only iteration contract shared by the iterators and the engine.
pub use crate::iterator::Cursor;
/// Validated memory subsystem model; construct with `SubsystemBuilder`.
pub use crate::model::{Subsystem, SubsystemBuilder};
/// Result of solving one structure.
pub use crate::solver::{Solution, SolverResult};

//! Bit-field formulas and their execution and solving.
//!
//! 1. **Formula:** Symbolic variables, terms, equations and clauses.
//! 2. **Executor:** Paths and structures to formulas.
//! 3. **Constraints:** Integer and region constraints compiled to clauses.
//! 4. **Solver:** Satisfiability checks and randomized value extraction.

/// Integer and range constraints as clauses.
pub mod constraints;
/// Symbolic execution of paths and structures.
pub mod executor;
/// Formula representation.
pub mod formula;
/// Bit-level solver.
pub mod solver;

pub use executor::{SymbolicExecutor, SymbolicResult};
pub use formula::{Clause, Equation, Formula, Operand, SymVar, Term};
pub use solver::{BitSolver, Initializer, Valuation};

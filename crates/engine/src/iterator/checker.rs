//! Feasibility checks.

use tracing::trace;

use super::filters::FilterBuilder;
use crate::access::structure::Structure;
use crate::model::Subsystem;
use crate::symbolic::constraints::integer_clause;
use crate::symbolic::executor::SymbolicExecutor;
use crate::symbolic::solver::BitSolver;

/// Decides whether a structure may be realizable: its filters pass and its formula,
/// together with the integer constraints of each access, is satisfiable. No value is
/// extracted.
#[derive(Debug, Clone, Copy)]
pub struct StructureChecker<'a> {
    subsystem: &'a Subsystem,
    filters: &'a FilterBuilder,
}

impl<'a> StructureChecker<'a> {
    /// Creates a checker applying `filters`.
    pub const fn new(subsystem: &'a Subsystem, filters: &'a FilterBuilder) -> Self {
        Self { subsystem, filters }
    }

    /// Returns whether `structure` passes the filters and is satisfiable.
    pub fn check(&self, structure: &Structure) -> bool {
        if !self.filters.test(self.subsystem, structure) {
            trace!("structure filtered out");
            return false;
        }
        let result = SymbolicExecutor::new(self.subsystem).execute_structure(structure);
        if let Some(reason) = result.conflict_reason() {
            trace!(%reason, "structure conflict");
            return false;
        }
        let mut formula = result.formula().clone();
        for (slot, access) in structure.accesses().iter().enumerate() {
            for constraint in &access.constraints().integers {
                match integer_clause(self.subsystem, constraint, slot as u32) {
                    Ok(clause) => formula.push(clause),
                    Err(_) => return false,
                }
            }
        }
        let sat = BitSolver::new(self.subsystem).check(&formula);
        trace!(clauses = formula.len(), sat, "structure checked");
        sat
    }
}

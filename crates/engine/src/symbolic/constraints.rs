//! Integer constraints compiled to clauses.
//!
//! A range `min..=max` over a `w`-bit term is decomposed into maximal aligned blocks; each
//! block is the set of values sharing a bit prefix, so the range becomes a disjunction of
//! prefix equalities. Retained values become a disjunction of equalities and excluded
//! values a conjunction of disequalities.

use super::formula::{Clause, Equation, Operand, SymVar, Term};
use crate::common::{bits, Result};
use crate::config::{IntegerConstraint, IntegerConstraintKind};
use crate::model::{Field, Subsystem, VarId};

/// Clause restricting `term` to `min..=max`.
pub fn range_clause(term: Term, min: u64, max: u64) -> Clause {
    let width = term.width();
    let max = max.min(bits::mask(width));
    if min > max {
        return Clause::falsity();
    }
    let hi = u128::from(max);
    let mut lo = u128::from(min);
    let mut blocks = Vec::new();
    while lo <= hi {
        let mut k = if lo == 0 {
            width
        } else {
            lo.trailing_zeros().min(width)
        };
        while k > 0 && lo + (1u128 << k) - 1 > hi {
            k -= 1;
        }
        if k == width {
            return Clause::truth();
        }
        blocks.push(Clause::term_equals(
            term.slice(k, width - k),
            (lo >> k) as u64,
        ));
        lo += 1u128 << k;
    }
    Clause::Or(blocks)
}

/// Clause restricting `term` to one of `values`.
pub fn retain_clause(term: Term, values: &[u64]) -> Clause {
    Clause::Or(values.iter().map(|&v| Clause::term_equals(term, v)).collect())
}

/// Clause excluding every one of `values` from `term`.
pub fn exclude_clause(term: Term, values: &[u64]) -> Clause {
    Clause::And(
        values
            .iter()
            .map(|&v| Clause::Equation(Equation::disequality(term, Operand::Const(v))))
            .collect(),
    )
}

/// Term covering all bits of `var` in `slot` and `frame`.
pub fn whole(subsystem: &Subsystem, var: VarId, slot: u32, frame: u32) -> Term {
    let width = subsystem.variable(var).width;
    Term::of(&Field::whole(var, width), slot, frame)
}

/// Compiles an integer constraint on a top-level variable of the access in `slot`.
///
/// # Errors
///
/// Returns an error when the constrained variable does not exist.
pub fn integer_clause(subsystem: &Subsystem, constraint: &IntegerConstraint, slot: u32) -> Result<Clause> {
    let var = constraint.resolve(subsystem)?;
    let term = whole(subsystem, var, slot, 0);
    Ok(match &constraint.kind {
        IntegerConstraintKind::Range { min, max } => range_clause(term, *min, *max),
        IntegerConstraintKind::Retain { values } => retain_clause(term, values),
        IntegerConstraintKind::Exclude { values } => exclude_clause(term, values),
    })
}

/// Clause fixing `var` to `value`.
pub fn fix(subsystem: &Subsystem, var: SymVar, value: u64) -> Clause {
    Clause::term_equals(whole(subsystem, var.var, var.slot, var.frame), value)
}

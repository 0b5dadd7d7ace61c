//! Symbolic execution of access paths and structures.
//!
//! Walking a path entry by entry, the executor turns:
//! 1. **Guard conditions** into clauses (a conjunction per equality atom, a disjunction per
//!    disequality atom).
//! 2. **Assignments** into equalities between the assigned bits and the concatenated
//!    right-hand side, with the bits the right-hand side does not reach forced to zero.
//! 3. **Calls and returns** into bindings between the caller's and the callee's frames.
//!
//! Bits fixed by constant assignments and by equality guards are tracked as they become
//! known; a guard contradicting them makes the whole path a conflict without ever reaching
//! the solver.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use super::formula::{Clause, Equation, Formula, Operand, SymVar, Term};
use crate::access::path::{AccessPath, PathEntry};
use crate::access::structure::Structure;
use crate::common::bits;
use crate::model::{ActionId, Atom, ConditionKind, Expression, Field, Rhs, Subsystem, TransitionId};

/// Outcome of symbolic execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicResult {
    formula: Formula,
    variables: BTreeSet<SymVar>,
    conflict: Option<String>,
}

impl SymbolicResult {
    fn conflict(reason: String) -> Self {
        Self {
            formula: Formula::new(),
            variables: BTreeSet::new(),
            conflict: Some(reason),
        }
    }

    /// The formula (empty for a conflict).
    pub const fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Every variable of the formula.
    pub const fn variables(&self) -> &BTreeSet<SymVar> {
        &self.variables
    }

    /// Returns whether execution hit a statically known contradiction.
    pub const fn is_conflict(&self) -> bool {
        self.conflict.is_some()
    }

    /// Reason of the contradiction, if any.
    pub fn conflict_reason(&self) -> Option<&str> {
        self.conflict.as_deref()
    }
}

/// Bits of each variable that are statically known: `(mask, value)`.
#[derive(Debug, Default)]
struct Known {
    bits: BTreeMap<SymVar, (u64, u64)>,
}

impl Known {
    fn get(&self, term: &Term) -> (u64, u64) {
        let (mask, value) = self.bits.get(&term.var).copied().unwrap_or((0, 0));
        (
            bits::extract(mask, term.lo, term.hi),
            bits::extract(value, term.lo, term.hi),
        )
    }

    /// Records `term == value`; returns `false` when it contradicts a known bit.
    fn set(&mut self, term: &Term, value: u64) -> bool {
        let (known_mask, known_value) = self.get(term);
        if (known_value ^ value) & known_mask != 0 {
            return false;
        }
        let field = bits::mask(term.width()) << term.lo;
        let entry = self.bits.entry(term.var).or_insert((0, 0));
        entry.0 |= field;
        entry.1 = (entry.1 & !field) | ((value << term.lo) & field);
        true
    }

    /// Records the bits fixed by an equality atom.
    fn learn(&mut self, atom: &Atom, frame: u32) {
        let mut shift = 0;
        for f in atom.expr.fields() {
            let part = (if shift < 64 { atom.value >> shift } else { 0 }) & bits::mask(f.width());
            let _ = self.set(&Term::of(f, 0, frame), part);
            shift += f.width();
        }
    }

    /// Returns whether `term == value` contradicts the known bits.
    fn refutes_eq(&self, term: &Term, value: u64) -> bool {
        let (mask, known) = self.get(term);
        (known ^ value) & mask != 0
    }

    /// Returns whether `term != value` contradicts the known bits.
    fn refutes_ne(&self, term: &Term, value: u64) -> bool {
        let (mask, known) = self.get(term);
        mask == bits::mask(term.width()) && known == value
    }
}

/// Symbolic executor over a subsystem.
#[derive(Debug, Clone, Copy)]
pub struct SymbolicExecutor<'a> {
    subsystem: &'a Subsystem,
}

impl<'a> SymbolicExecutor<'a> {
    /// Creates an executor.
    pub const fn new(subsystem: &'a Subsystem) -> Self {
        Self { subsystem }
    }

    /// Executes a path in slot 0.
    pub fn execute_path(&self, path: &AccessPath) -> SymbolicResult {
        let mut formula = Formula::new();
        let mut known = Known::default();
        match self.walk(path, &mut formula, &mut known) {
            Ok(()) => {
                let mut variables = formula.variables();
                variables.extend(path.free_variables().iter().copied());
                for instance in path.address_instances() {
                    let var = self.subsystem.address(instance.address).var;
                    let _ = variables.insert(SymVar::new(0, var, instance.frame));
                }
                trace!(clauses = formula.len(), vars = variables.len(), "path formula");
                SymbolicResult {
                    formula,
                    variables,
                    conflict: None,
                }
            }
            Err(reason) => {
                trace!(%reason, "path conflict");
                SymbolicResult::conflict(reason)
            }
        }
    }

    /// Executes a structure: each access's path formula moved into the access's slot,
    /// plus the condition of every hazard of the dependency matrix.
    pub fn execute_structure(&self, structure: &Structure) -> SymbolicResult {
        let mut formula = Formula::new();
        let mut variables = BTreeSet::new();
        for (slot, access) in structure.accesses().iter().enumerate() {
            let result = access.path().symbolic(self.subsystem);
            if let Some(reason) = result.conflict_reason() {
                return SymbolicResult::conflict(format!("access {slot}: {reason}"));
            }
            let slot = slot as u32;
            formula.extend(&result.formula.with_slot(slot));
            variables.extend(
                result
                    .variables
                    .iter()
                    .map(|v| SymVar::new(slot, v.var, v.frame)),
            );
        }
        for (&(i, j), dependency) in structure.dependencies() {
            for hazard in dependency.hazards() {
                formula.push(hazard.condition_clause(self.subsystem, i as u32, j as u32));
            }
        }
        SymbolicResult {
            formula,
            variables,
            conflict: None,
        }
    }

    fn walk(&self, path: &AccessPath, formula: &mut Formula, known: &mut Known) -> Result<(), String> {
        self.enter(self.subsystem.start(), 0, formula, known)?;
        for entry in path.entries() {
            match *entry {
                PathEntry::Transition { transition, frame } => {
                    self.guard(transition, frame, formula, known)?;
                    let target = self.subsystem.transition(transition).target;
                    self.enter(target, frame, formula, known)?;
                }
                PathEntry::Call {
                    transition,
                    caller,
                    callee,
                } => {
                    self.guard(transition, caller, formula, known)?;
                    if let Some(call) = &self.subsystem.transition(transition).call {
                        let formal = self.subsystem.address(call.formal).var;
                        let width = self.subsystem.variable(formal).width;
                        let lhs = Term::of(&Field::whole(formal, width), 0, callee);
                        self.assign(lhs, &Rhs::Expr(call.actual.clone()), caller, formula, known)?;
                        self.enter(call.procedure, callee, formula, known)?;
                    }
                }
                PathEntry::Return {
                    transition,
                    callee,
                    caller,
                } => {
                    let t = self.subsystem.transition(transition);
                    if let Some(result) = t.call.as_ref().and_then(|c| c.result) {
                        let lhs = Term::of(&result.caller, 0, caller);
                        let rhs = Rhs::Expr(Expression::field(result.callee));
                        self.assign(lhs, &rhs, callee, formula, known)?;
                    }
                    self.enter(t.target, caller, formula, known)?;
                }
            }
        }
        Ok(())
    }

    fn enter(
        &self,
        action: ActionId,
        frame: u32,
        formula: &mut Formula,
        known: &mut Known,
    ) -> Result<(), String> {
        for a in &self.subsystem.action(action).assignments {
            self.assign(Term::of(&a.lhs, 0, frame), &a.rhs, frame, formula, known)
                .map_err(|e| format!("action `{}`: {e}", self.subsystem.action(action).name))?;
        }
        Ok(())
    }

    fn assign(
        &self,
        lhs: Term,
        rhs: &Rhs,
        rhs_frame: u32,
        formula: &mut Formula,
        known: &mut Known,
    ) -> Result<(), String> {
        let name = &self.subsystem.variable(lhs.var.var).name;
        match rhs {
            Rhs::Const(value) => {
                formula.push(Clause::term_equals(lhs, *value));
                if !known.set(&lhs, *value) {
                    return Err(format!("`{name}` assigned {value:#x} against known bits"));
                }
            }
            Rhs::Expr(expr) => {
                let mut shift = 0;
                for f in expr.fields() {
                    let part = lhs.slice(shift, f.width());
                    let source = Term::of(f, 0, rhs_frame);
                    formula.push(Clause::Equation(Equation::equality(
                        part,
                        Operand::Term(source),
                    )));
                    let (mask, value) = known.get(&source);
                    if mask == bits::mask(f.width()) && !known.set(&part, value) {
                        return Err(format!("`{name}` assigned against known bits"));
                    }
                    shift += f.width();
                }
                if shift < lhs.width() {
                    let high = lhs.slice(shift, lhs.width() - shift);
                    formula.push(Clause::term_equals(high, 0));
                    if !known.set(&high, 0) {
                        return Err(format!("`{name}` zero-extended against known bits"));
                    }
                }
            }
        }
        Ok(())
    }

    fn guard(
        &self,
        transition: TransitionId,
        frame: u32,
        formula: &mut Formula,
        known: &mut Known,
    ) -> Result<(), String> {
        let Some(condition) = &self.subsystem.transition(transition).guard.condition else {
            return Ok(());
        };
        let refuted = |atom: &Atom| {
            let mut shift = 0;
            let mut fields = Vec::new();
            for f in atom.expr.fields() {
                let part = (if shift < 64 { atom.value >> shift } else { 0 }) & bits::mask(f.width());
                fields.push((Term::of(f, 0, frame), part));
                shift += f.width();
            }
            if atom.equal {
                fields.iter().any(|(t, v)| known.refutes_eq(t, *v))
            } else {
                !fields.is_empty() && fields.iter().all(|(t, v)| known.refutes_ne(t, *v))
            }
        };
        let clause = |atom: &Atom| {
            if atom.equal {
                Clause::expr_equals(&atom.expr, 0, frame, atom.value)
            } else {
                Clause::expr_differs(&atom.expr, 0, frame, atom.value)
            }
        };
        let contradicted = match condition.kind {
            ConditionKind::And => condition.atoms.iter().any(refuted),
            ConditionKind::Or => condition.atoms.iter().all(refuted),
        };
        if contradicted {
            return Err(format!("guard of transition #{} contradicts known bits", transition.0));
        }
        match condition.kind {
            ConditionKind::And => {
                for atom in &condition.atoms {
                    formula.push(clause(atom));
                    if atom.equal {
                        known.learn(atom, frame);
                    }
                }
            }
            ConditionKind::Or => {
                formula.push(Clause::Or(condition.atoms.iter().map(clause).collect()));
                if let [atom] = condition.atoms.as_slice() {
                    if atom.equal {
                        known.learn(atom, frame);
                    }
                }
            }
        }
        Ok(())
    }
}

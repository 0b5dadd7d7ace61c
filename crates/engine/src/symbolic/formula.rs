//! Bit-field formulas.
//!
//! A formula is a conjunction of clauses; a clause is an equation between a bit-range of a
//! symbolic variable and another bit-range or a constant, or a conjunction/disjunction of
//! clauses. Symbolic variables are model variables instantiated per access slot and per
//! call frame.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::common::bits;
use crate::model::{Expression, Field, VarId};

/// A model variable instantiated in an access slot and a call frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymVar {
    /// Access position within a structure (0 for a standalone path).
    pub slot: u32,
    /// Model variable.
    pub var: VarId,
    /// Call frame (0 for the top level).
    pub frame: u32,
}

impl SymVar {
    /// Creates a symbolic variable.
    pub const fn new(slot: u32, var: VarId, frame: u32) -> Self {
        Self { slot, var, frame }
    }
}

/// Bits `[hi:lo]` of a symbolic variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term {
    /// Variable.
    pub var: SymVar,
    /// Low bit.
    pub lo: u32,
    /// High bit.
    pub hi: u32,
}

impl Term {
    /// Creates a term.
    pub const fn new(var: SymVar, lo: u32, hi: u32) -> Self {
        Self { var, lo, hi }
    }

    /// Instantiates a model field.
    pub const fn of(field: &Field, slot: u32, frame: u32) -> Self {
        Self::new(SymVar::new(slot, field.var, frame), field.lo, field.hi)
    }

    /// Width in bits.
    pub const fn width(&self) -> u32 {
        self.hi - self.lo + 1
    }

    /// Sub-range `[lo + from, lo + from + width - 1]`.
    pub const fn slice(&self, from: u32, width: u32) -> Self {
        Self::new(self.var, self.lo + from, self.lo + from + width - 1)
    }
}

/// Right-hand side of an equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Another bit-range.
    Term(Term),
    /// A constant.
    Const(u64),
}

/// `lhs == rhs` or `lhs != rhs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Equation {
    /// Left-hand side.
    pub lhs: Term,
    /// Right-hand side.
    pub rhs: Operand,
    /// Equality or disequality.
    pub equal: bool,
}

impl Equation {
    /// `lhs == rhs`.
    pub const fn equality(lhs: Term, rhs: Operand) -> Self {
        Self {
            lhs,
            rhs,
            equal: true,
        }
    }

    /// `lhs != rhs`.
    pub const fn disequality(lhs: Term, rhs: Operand) -> Self {
        Self {
            lhs,
            rhs,
            equal: false,
        }
    }
}

/// A clause of a formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Clause {
    /// A single equation.
    Equation(Equation),
    /// All sub-clauses hold (empty = true).
    And(Vec<Clause>),
    /// At least one sub-clause holds (empty = false).
    Or(Vec<Clause>),
}

impl Clause {
    /// The clause that always holds.
    pub const fn truth() -> Self {
        Self::And(Vec::new())
    }

    /// The clause that never holds.
    pub const fn falsity() -> Self {
        Self::Or(Vec::new())
    }

    /// `term == value` for a constant wider than nothing.
    pub const fn term_equals(term: Term, value: u64) -> Self {
        Self::Equation(Equation::equality(term, Operand::Const(value)))
    }

    /// Equality of two single-variable expressions instantiated in different slots.
    ///
    /// Fields are paired positionally; both expressions must have the same shape.
    pub fn exprs_equal(expr: &Expression, left: (u32, u32), right: (u32, u32)) -> Self {
        Self::And(
            expr.fields()
                .iter()
                .map(|f| {
                    Self::Equation(Equation::equality(
                        Term::of(f, left.0, left.1),
                        Operand::Term(Term::of(f, right.0, right.1)),
                    ))
                })
                .collect(),
        )
    }

    /// Disequality of two instantiations of a single-variable expression.
    pub fn exprs_differ(expr: &Expression, left: (u32, u32), right: (u32, u32)) -> Self {
        Self::Or(
            expr.fields()
                .iter()
                .map(|f| {
                    Self::Equation(Equation::disequality(
                        Term::of(f, left.0, left.1),
                        Operand::Term(Term::of(f, right.0, right.1)),
                    ))
                })
                .collect(),
        )
    }

    /// `expr == value`, split per field.
    pub fn expr_equals(expr: &Expression, slot: u32, frame: u32, value: u64) -> Self {
        Self::And(
            Self::split(expr, value)
                .map(|(f, part)| Self::term_equals(Term::of(f, slot, frame), part))
                .collect(),
        )
    }

    /// `expr != value`, split per field.
    pub fn expr_differs(expr: &Expression, slot: u32, frame: u32, value: u64) -> Self {
        Self::Or(
            Self::split(expr, value)
                .map(|(f, part)| {
                    Self::Equation(Equation::disequality(Term::of(f, slot, frame), Operand::Const(part)))
                })
                .collect(),
        )
    }

    fn split(expr: &Expression, value: u64) -> impl Iterator<Item = (&Field, u64)> {
        let mut shift = 0;
        expr.fields().iter().map(move |f| {
            let part = if shift < 64 {
                (value >> shift) & bits::mask(f.width())
            } else {
                0
            };
            shift += f.width();
            (f, part)
        })
    }

    /// Moves every variable of the clause into `slot`.
    #[must_use]
    pub fn with_slot(&self, slot: u32) -> Self {
        let rename = |t: &Term| Term::new(SymVar::new(slot, t.var.var, t.var.frame), t.lo, t.hi);
        match self {
            Self::Equation(e) => Self::Equation(Equation {
                lhs: rename(&e.lhs),
                rhs: match e.rhs {
                    Operand::Term(t) => Operand::Term(rename(&t)),
                    c @ Operand::Const(_) => c,
                },
                equal: e.equal,
            }),
            Self::And(cs) => Self::And(cs.iter().map(|c| c.with_slot(slot)).collect()),
            Self::Or(cs) => Self::Or(cs.iter().map(|c| c.with_slot(slot)).collect()),
        }
    }

    /// Adds every variable of the clause to `out`.
    pub fn collect_vars(&self, out: &mut BTreeSet<SymVar>) {
        match self {
            Self::Equation(e) => {
                let _ = out.insert(e.lhs.var);
                if let Operand::Term(t) = e.rhs {
                    let _ = out.insert(t.var);
                }
            }
            Self::And(cs) | Self::Or(cs) => cs.iter().for_each(|c| c.collect_vars(out)),
        }
    }

    /// Evaluates the clause under an assignment of variable values.
    pub fn holds(&self, value_of: &impl Fn(SymVar) -> u64) -> bool {
        match self {
            Self::Equation(e) => {
                let l = bits::extract(value_of(e.lhs.var), e.lhs.lo, e.lhs.hi);
                let r = match e.rhs {
                    Operand::Term(t) => bits::extract(value_of(t.var), t.lo, t.hi),
                    Operand::Const(c) => c,
                };
                (l == r) == e.equal
            }
            Self::And(cs) => cs.iter().all(|c| c.holds(value_of)),
            Self::Or(cs) => cs.iter().any(|c| c.holds(value_of)),
        }
    }
}

/// Conjunction of clauses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Formula {
    clauses: Vec<Clause>,
}

impl Formula {
    /// The empty (true) formula.
    pub const fn new() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Adds a clause.
    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Adds every clause of `other`.
    pub fn extend(&mut self, other: &Self) {
        self.clauses.extend(other.clauses.iter().cloned());
    }

    /// The clauses.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Number of clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Returns whether the formula has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Moves every variable into `slot`.
    #[must_use]
    pub fn with_slot(&self, slot: u32) -> Self {
        Self {
            clauses: self.clauses.iter().map(|c| c.with_slot(slot)).collect(),
        }
    }

    /// All variables of the formula.
    pub fn variables(&self) -> BTreeSet<SymVar> {
        let mut out = BTreeSet::new();
        self.clauses.iter().for_each(|c| c.collect_vars(&mut out));
        out
    }

    /// Evaluates the formula under an assignment of variable values.
    pub fn holds(&self, value_of: &impl Fn(SymVar) -> u64) -> bool {
        self.clauses.iter().all(|c| c.holds(value_of))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{}@{}.{}[{}:{}]",
            self.var.var.0, self.var.slot, self.var.frame, self.hi, self.lo
        )
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equation(e) => {
                let op = if e.equal { "==" } else { "!=" };
                match e.rhs {
                    Operand::Term(t) => write!(f, "{} {op} {t}", e.lhs),
                    Operand::Const(c) => write!(f, "{} {op} {c:#x}", e.lhs),
                }
            }
            Self::And(cs) | Self::Or(cs) => {
                let sep = if matches!(self, Self::And(_)) { " && " } else { " || " };
                write!(f, "(")?;
                for (i, c) in cs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{sep}")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            }
        }
    }
}

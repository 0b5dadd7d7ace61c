//! Symbolic Execution Unit Tests.
//!
//! Guards and assignments over small hand-built graphs: statically contradicted guards
//! drop a path before solving, and calls bind the caller's and callee's frames.

use std::collections::BTreeSet;

use mmutest_core::access::{AccessPathBuilder, PathEntry};
use mmutest_core::common::Randomizer;
use mmutest_core::config::MemoryAccessConstraints;
use mmutest_core::coverage::PathExtractor;
use mmutest_core::model::{
    Assignment, Atom, Call, Condition, Field, Guard, ResultBinding, Subsystem, SubsystemBuilder, Transition,
    TransitionId, VarId,
};
use mmutest_core::symbolic::{BitSolver, Clause, Initializer, SymVar, SymbolicExecutor, Term};
use pretty_assertions::assert_eq;

use crate::common::harness::{LOAD, init_tracing};

fn mode(var: VarId) -> Field {
    Field::new(var, 0, 1)
}

fn extract(subsystem: &Subsystem) -> usize {
    init_tracing();
    PathExtractor::new(subsystem, 16, 64)
        .extract(LOAD, &MemoryAccessConstraints::default())
        .unwrap()
        .len()
}

/// `START` sets `MODE = 2`, then branches on guards over `MODE`.
fn mode_subsystem(conditions: Vec<Condition>) -> Subsystem {
    let mut b = SubsystemBuilder::new();
    let va = b.address("VA", 8);
    let m = b.variable("MODE", 2);
    let start = b.action("START", vec![Assignment::constant(mode(m), 2)]);
    for (i, condition) in conditions.into_iter().enumerate() {
        let target = b.action(format!("T{i}"), Vec::new());
        let _ = b.transition(Transition::guarded(start, target, Guard::always().with_condition(condition)));
    }
    b.start(start);
    b.virtual_address(va);
    b.build().unwrap()
}

// ══════════════════════════════════════════════════════════
// 1. Known bits
// ══════════════════════════════════════════════════════════

#[test]
fn guard_against_constant_drops_the_path() {
    let m = VarId(1);
    let s = mode_subsystem(vec![
        Condition::all(vec![Atom::equals(mode(m).into(), 2)]),
        Condition::all(vec![Atom::equals(mode(m).into(), 1)]),
    ]);
    assert_eq!(extract(&s), 1);

    let mut builder = AccessPathBuilder::new(&s);
    builder.transition(TransitionId(1), 0);
    let result = SymbolicExecutor::new(&s).execute_path(&builder.build());
    assert!(result.is_conflict());
    assert!(result.formula().is_empty());
    assert!(result.conflict_reason().unwrap().contains("contradicts known bits"));
}

#[test]
fn disjunction_is_refuted_only_when_every_atom_is() {
    let m = VarId(1);
    let s = mode_subsystem(vec![
        Condition::any(vec![Atom::equals(mode(m).into(), 1), Atom::equals(mode(m).into(), 3)]),
        Condition::any(vec![Atom::equals(mode(m).into(), 1), Atom::equals(mode(m).into(), 2)]),
        Condition::all(vec![Atom::differs(mode(m).into(), 2)]),
        Condition::all(vec![Atom::differs(mode(m).into(), 0)]),
    ]);
    assert_eq!(extract(&s), 2);
}

#[test]
fn earlier_equality_guard_is_known_to_later_guards() {
    let mut b = SubsystemBuilder::new();
    let va = b.address("VA", 8);
    let var = b.address_var(va).unwrap();
    let tag = Field::new(var, 4, 7);
    let start = b.action("START", Vec::new());
    let mid = b.action("MID", Vec::new());
    let end = b.action("END", Vec::new());
    let first = Guard::always().with_condition(Condition::all(vec![Atom::equals(tag.into(), 0xA)]));
    let second = Guard::always().with_condition(Condition::all(vec![Atom::equals(tag.into(), 0xB)]));
    let t0 = b.transition(Transition::guarded(start, mid, first));
    let t1 = b.transition(Transition::guarded(mid, end, second));
    b.start(start);
    b.virtual_address(va);
    let s = b.build().unwrap();
    assert_eq!(extract(&s), 0);

    let mut builder = AccessPathBuilder::new(&s);
    builder.transition(t0, 0);
    let prefix = SymbolicExecutor::new(&s).execute_path(&builder.build());
    assert!(!prefix.is_conflict());
    assert_eq!(prefix.formula().len(), 1);

    builder.transition(t1, 0);
    let result = SymbolicExecutor::new(&s).execute_path(&builder.build());
    assert_eq!(
        result.conflict_reason(),
        Some(format!("guard of transition #{} contradicts known bits", t1.0).as_str())
    );
}

// ══════════════════════════════════════════════════════════
// 2. Calls
// ══════════════════════════════════════════════════════════

#[test]
fn call_binds_actual_and_result() {
    let mut b = SubsystemBuilder::new();
    let va = b.address("VA", 8);
    let va_var = b.address_var(va).unwrap();
    let input = b.address("IN", 8);
    let in_var = b.address_var(input).unwrap();
    let out = b.variable("OUT", 4);
    let r = b.variable("R", 4);
    let start = b.action("START", Vec::new());
    let end = b.action("END", Vec::new());
    let procedure = b.action("PROC", vec![Assignment::expr(Field::whole(out, 4), Field::new(in_var, 4, 7))]);
    let call = Call {
        procedure,
        formal: input,
        actual: Field::whole(va_var, 8).into(),
        result: Some(ResultBinding {
            caller: Field::whole(r, 4),
            callee: Field::whole(out, 4),
        }),
    };
    let _ = b.transition(Transition::new(start, end).with_call(call));
    b.start(start);
    b.virtual_address(va);
    let s = b.build().unwrap();

    init_tracing();
    let paths = PathExtractor::new(&s, 16, 64)
        .extract(LOAD, &MemoryAccessConstraints::default())
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert!(matches!(paths[0].entries()[0], PathEntry::Call { caller: 0, callee: 1, .. }));
    assert!(matches!(paths[0].entries()[1], PathEntry::Return { caller: 0, callee: 1, .. }));

    let mut formula = paths[0].symbolic(&s).formula().clone();
    formula.push(Clause::term_equals(Term::new(SymVar::new(0, va_var, 0), 0, 7), 0xA5));
    let valuation = BitSolver::new(&s)
        .solve(&formula, &BTreeSet::new(), Initializer::Zeros, &mut Randomizer::new(1))
        .unwrap();
    assert_eq!(valuation.value(SymVar::new(0, in_var, 1)), 0xA5);
    assert_eq!(valuation.value(SymVar::new(0, r, 0)), 0xA);
}

//! Bit-level solver for bit-field formulas.
//!
//! Every bit of every variable is a node of a union-find structure with parity: an
//! equation between two bits either joins their classes (`a == b`) or joins them with odd
//! parity (`a != b`). A distinguished node stands for the constant zero, so a bit compared
//! with a constant is joined to it. Conjunctions are asserted directly; disjunctions are
//! decided by backtracking search over their alternatives, most constrained first, undoing
//! unions through a trail.
//!
//! # Performance
//!
//! - **Assertion:** Near-linear in the number of bits.
//! - **Disjunctions:** Exponential in the worst case; the search is bounded by a step budget
//!   and gives up (answers unsatisfiable) once it is spent.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use super::formula::{Clause, Formula, Operand, SymVar, Term};
use crate::common::Randomizer;
use crate::model::Subsystem;

/// Maximum number of branching steps of one search.
const SEARCH_BUDGET: usize = 1 << 16;

/// Index of the constant-zero node.
const ZERO: usize = 0;

/// How bits left unconstrained by the formula are valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Initializer {
    /// Free bits are zero.
    Zeros,
    /// Free bits are random; disjunction alternatives are also tried in random order.
    #[default]
    Random,
}

/// Values of symbolic variables found by the solver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Valuation {
    values: BTreeMap<SymVar, u64>,
}

impl Valuation {
    /// Value of `var`, if it was solved.
    pub fn get(&self, var: SymVar) -> Option<u64> {
        self.values.get(&var).copied()
    }

    /// Value of `var`, zero if it was not solved.
    pub fn value(&self, var: SymVar) -> u64 {
        self.get(var).unwrap_or(0)
    }

    /// All solved variables.
    pub fn iter(&self) -> impl Iterator<Item = (&SymVar, &u64)> {
        self.values.iter()
    }

    /// Number of solved variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether nothing was solved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug)]
enum Goal {
    Bit { a: usize, b: usize, odd: bool },
    All(Vec<Goal>),
    Any(Vec<Goal>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    True,
    False,
    Unknown,
}

#[derive(Debug)]
struct UnionFind {
    parent: Vec<usize>,
    parity: Vec<bool>,
    size: Vec<u32>,
    trail: Vec<usize>,
}

impl UnionFind {
    fn new(nodes: usize) -> Self {
        Self {
            parent: (0..nodes).collect(),
            parity: vec![false; nodes],
            size: vec![1; nodes],
            trail: Vec::new(),
        }
    }

    fn find(&self, mut x: usize) -> (usize, bool) {
        let mut parity = false;
        while self.parent[x] != x {
            parity ^= self.parity[x];
            x = self.parent[x];
        }
        (x, parity)
    }

    /// Asserts `a ^ b == odd`; returns `false` on contradiction.
    fn union(&mut self, a: usize, b: usize, odd: bool) -> bool {
        let (ra, pa) = self.find(a);
        let (rb, pb) = self.find(b);
        if ra == rb {
            return (pa ^ pb) == odd;
        }
        let (child, root) = if self.size[ra] < self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[child] = root;
        self.parity[child] = pa ^ pb ^ odd;
        self.size[root] += self.size[child];
        self.trail.push(child);
        true
    }

    const fn mark(&self) -> usize {
        self.trail.len()
    }

    fn undo(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some(child) = self.trail.pop() {
                let root = self.parent[child];
                self.size[root] -= self.size[child];
                self.parent[child] = child;
                self.parity[child] = false;
            }
        }
    }

    fn status(&self, goal: &Goal) -> Status {
        match goal {
            Goal::Bit { a, b, odd } => {
                let (ra, pa) = self.find(*a);
                let (rb, pb) = self.find(*b);
                if ra != rb {
                    Status::Unknown
                } else if (pa ^ pb) == *odd {
                    Status::True
                } else {
                    Status::False
                }
            }
            Goal::All(goals) => {
                let mut all = true;
                for g in goals {
                    match self.status(g) {
                        Status::False => return Status::False,
                        Status::Unknown => all = false,
                        Status::True => {}
                    }
                }
                if all { Status::True } else { Status::Unknown }
            }
            Goal::Any(goals) => {
                let mut none = true;
                for g in goals {
                    match self.status(g) {
                        Status::True => return Status::True,
                        Status::Unknown => none = false,
                        Status::False => {}
                    }
                }
                if none { Status::False } else { Status::Unknown }
            }
        }
    }
}

/// Maps every bit of every variable to a node.
#[derive(Debug, Default)]
struct Layout {
    base: BTreeMap<SymVar, (usize, u32)>,
    nodes: usize,
}

impl Layout {
    fn new(subsystem: &Subsystem, vars: &BTreeSet<SymVar>) -> Self {
        let mut base = BTreeMap::new();
        let mut nodes = 1;
        for &v in vars {
            let width = subsystem.variable(v.var).width;
            let _ = base.insert(v, (nodes, width));
            nodes += width as usize;
        }
        Self { base, nodes }
    }

    fn bit(&self, term: &Term, k: u32) -> usize {
        if k >= term.width() {
            return ZERO;
        }
        match self.base.get(&term.var) {
            Some(&(start, width)) if term.lo + k < width => start + (term.lo + k) as usize,
            _ => ZERO,
        }
    }

    fn compile(&self, clause: &Clause) -> Goal {
        match clause {
            Clause::And(cs) => Goal::All(cs.iter().map(|c| self.compile(c)).collect()),
            Clause::Or(cs) => Goal::Any(cs.iter().map(|c| self.compile(c)).collect()),
            Clause::Equation(e) => {
                let bits: Vec<Goal> = match e.rhs {
                    Operand::Term(t) => {
                        let width = e.lhs.width().max(t.width());
                        (0..width)
                            .map(|k| Goal::Bit {
                                a: self.bit(&e.lhs, k),
                                b: self.bit(&t, k),
                                odd: !e.equal,
                            })
                            .collect()
                    }
                    Operand::Const(c) => {
                        let width = e.lhs.width();
                        if width < 64 && c >> width != 0 {
                            // The constant does not fit: equality is false, disequality true.
                            return if e.equal {
                                Goal::Any(Vec::new())
                            } else {
                                Goal::All(Vec::new())
                            };
                        }
                        (0..width)
                            .map(|k| Goal::Bit {
                                a: self.bit(&e.lhs, k),
                                b: ZERO,
                                odd: ((c >> k) & 1 == 1) ^ !e.equal,
                            })
                            .collect()
                    }
                };
                if e.equal { Goal::All(bits) } else { Goal::Any(bits) }
            }
        }
    }
}

struct Search<'r> {
    uf: UnionFind,
    rng: Option<&'r mut Randomizer>,
    budget: usize,
}

impl Search<'_> {
    fn run<'g>(&mut self, mut pending: Vec<&'g Goal>) -> bool {
        let mut choices: Vec<&'g Goal> = Vec::new();
        loop {
            while let Some(goal) = pending.pop() {
                match goal {
                    Goal::Bit { a, b, odd } => {
                        if !self.uf.union(*a, *b, *odd) {
                            return false;
                        }
                    }
                    Goal::All(goals) => pending.extend(goals.iter()),
                    Goal::Any(_) => choices.push(goal),
                }
            }
            let mut open = Vec::with_capacity(choices.len());
            for goal in choices.drain(..) {
                let Goal::Any(alternatives) = goal else {
                    continue;
                };
                let mut live = None;
                let mut count = 0;
                let mut satisfied = false;
                for alt in alternatives {
                    match self.uf.status(alt) {
                        Status::True => {
                            satisfied = true;
                            break;
                        }
                        Status::Unknown => {
                            count += 1;
                            live = Some(alt);
                        }
                        Status::False => {}
                    }
                }
                if satisfied {
                    continue;
                }
                match (count, live) {
                    (0, _) | (_, None) => return false,
                    (1, Some(alt)) => pending.push(alt),
                    _ => open.push(goal),
                }
            }
            choices = open;
            if pending.is_empty() {
                break;
            }
        }
        if choices.is_empty() {
            return true;
        }
        if self.budget == 0 {
            return false;
        }
        self.budget -= 1;

        let live_of = |uf: &UnionFind, goal: &'g Goal| -> Vec<&'g Goal> {
            match goal {
                Goal::Any(alts) => alts.iter().filter(|a| uf.status(a) != Status::False).collect(),
                _ => Vec::new(),
            }
        };
        let mut best = 0;
        let mut best_len = usize::MAX;
        for (i, goal) in choices.iter().enumerate() {
            let len = live_of(&self.uf, goal).len();
            if len < best_len {
                best = i;
                best_len = len;
            }
        }
        let goal = choices.swap_remove(best);
        let mut alternatives = live_of(&self.uf, goal);
        if let Some(rng) = self.rng.as_deref_mut() {
            rng.shuffle(&mut alternatives);
        }
        for alt in alternatives {
            let mark = self.uf.mark();
            let mut next = choices.clone();
            next.push(alt);
            if self.run(next) {
                return true;
            }
            self.uf.undo(mark);
        }
        false
    }
}

/// Solves formulas over the variables of a subsystem.
#[derive(Debug, Clone, Copy)]
pub struct BitSolver<'a> {
    subsystem: &'a Subsystem,
}

impl<'a> BitSolver<'a> {
    /// Creates a solver.
    pub const fn new(subsystem: &'a Subsystem) -> Self {
        Self { subsystem }
    }

    /// Decides satisfiability without extracting values.
    pub fn check(&self, formula: &Formula) -> bool {
        let layout = Layout::new(self.subsystem, &formula.variables());
        let goals: Vec<Goal> = formula.clauses().iter().map(|c| layout.compile(c)).collect();
        let mut search = Search {
            uf: UnionFind::new(layout.nodes),
            rng: None,
            budget: SEARCH_BUDGET,
        };
        search.run(goals.iter().collect())
    }

    /// Finds values for every variable of `formula` and of `extra`.
    ///
    /// # Arguments
    ///
    /// * `formula` - Constraints to satisfy.
    /// * `extra` - Variables to value even if the formula does not mention them.
    /// * `initializer` - Valuation of unconstrained bits.
    /// * `rng` - Randomizer for random initialization and search order.
    ///
    /// # Returns
    ///
    /// The valuation, or `None` if the formula is unsatisfiable (or the search budget ran out).
    pub fn solve(
        &self,
        formula: &Formula,
        extra: &BTreeSet<SymVar>,
        initializer: Initializer,
        rng: &mut Randomizer,
    ) -> Option<Valuation> {
        let mut vars = formula.variables();
        vars.extend(extra.iter().copied());
        let layout = Layout::new(self.subsystem, &vars);
        let goals: Vec<Goal> = formula.clauses().iter().map(|c| layout.compile(c)).collect();
        let random = initializer == Initializer::Random;
        let mut search = Search {
            uf: UnionFind::new(layout.nodes),
            rng: if random { Some(&mut *rng) } else { None },
            budget: SEARCH_BUDGET,
        };
        if !search.run(goals.iter().collect()) {
            trace!(clauses = formula.len(), "unsatisfiable");
            return None;
        }
        let uf = search.uf;

        let (zero_root, zero_parity) = uf.find(ZERO);
        let mut roots: BTreeMap<usize, bool> = BTreeMap::new();
        let mut values = BTreeMap::new();
        for (&var, &(start, width)) in &layout.base {
            let mut value = 0u64;
            for k in 0..width {
                let (root, parity) = uf.find(start + k as usize);
                let bit = if root == zero_root {
                    zero_parity ^ parity
                } else {
                    let root_value = *roots
                        .entry(root)
                        .or_insert_with(|| random && rng.next_bool());
                    root_value ^ parity
                };
                if bit {
                    value |= 1 << k;
                }
            }
            let _ = values.insert(var, value);
        }
        Some(Valuation { values })
    }
}

//! Access paths.
//!
//! An access path is one way an access can travel through the subsystem graph: an ordered
//! sequence of transitions, calls and returns. Everything else a path exposes is derived
//! once by [`AccessPathBuilder::build`]:
//! 1. **Actions:** Every action entered, with its frame.
//! 2. **Address instances:** Every address used, with its frame.
//! 3. **Buffer accesses:** Buffer checks on guards, plus synthesized reads of view parents.
//! 4. **Free variables:** Variables read but never assigned.
//! 5. **Regions:** Region restrictions met along the way.
//!
//! The symbolic-execution result is computed lazily and memoized in the path.

use std::sync::OnceLock;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::model::{
    ActionId, AddressId, BufferEvent, BufferId, Expression, Field, Rhs, Subsystem, TransitionId,
};
use crate::symbolic::executor::{SymbolicExecutor, SymbolicResult};
use crate::symbolic::formula::SymVar;

/// An address used in a specific call frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AddressInstance {
    /// Address type.
    pub address: AddressId,
    /// Call frame.
    pub frame: u32,
}

impl AddressInstance {
    /// Creates an address instance.
    pub const fn new(address: AddressId, frame: u32) -> Self {
        Self { address, frame }
    }
}

/// A lookup of a buffer with a given outcome at an address instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BufferAccess {
    /// Looked-up buffer.
    pub buffer: BufferId,
    /// Outcome.
    pub event: BufferEvent,
    /// Address the lookup is keyed by.
    pub address: AddressInstance,
}

impl BufferAccess {
    /// Creates a buffer access.
    pub const fn new(buffer: BufferId, event: BufferEvent, address: AddressInstance) -> Self {
        Self {
            buffer,
            event,
            address,
        }
    }

    /// Call frame of the lookup.
    pub const fn frame(&self) -> u32 {
        self.address.frame
    }
}

/// One step of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathEntry {
    /// A plain transition taken in `frame`.
    Transition {
        /// Transition taken.
        transition: TransitionId,
        /// Frame it is taken in.
        frame: u32,
    },
    /// A transition with a call, entering the callee in a fresh frame.
    Call {
        /// Transition carrying the call.
        transition: TransitionId,
        /// Frame of the caller.
        caller: u32,
        /// Fresh frame of the callee.
        callee: u32,
    },
    /// Return from a callee to the call transition's target.
    Return {
        /// Transition that carried the call.
        transition: TransitionId,
        /// Frame being left.
        callee: u32,
        /// Frame being resumed.
        caller: u32,
    },
}

/// An immutable path through the subsystem graph with its derived sets.
#[derive(Debug, Clone)]
pub struct AccessPath {
    entries: Vec<PathEntry>,
    actions: Vec<(ActionId, u32)>,
    addresses: BTreeSet<AddressInstance>,
    checks: Vec<BufferAccess>,
    reads: Vec<BufferAccess>,
    parents: BTreeMap<BufferAccess, BufferAccess>,
    events: BTreeMap<BufferId, BufferEvent>,
    free: BTreeSet<SymVar>,
    regions: BTreeSet<String>,
    symbolic: OnceLock<SymbolicResult>,
}

impl AccessPath {
    /// Path steps in order.
    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    /// Actions entered, with their frames, starting with the start action.
    pub fn actions(&self) -> &[(ActionId, u32)] {
        &self.actions
    }

    /// Address instances used along the path.
    pub const fn address_instances(&self) -> &BTreeSet<AddressInstance> {
        &self.addresses
    }

    /// Returns whether the path uses `instance`.
    pub fn contains_address(&self, instance: &AddressInstance) -> bool {
        self.addresses.contains(instance)
    }

    /// Buffer checks (hit/miss/read events on guards), in path order.
    pub fn buffer_checks(&self) -> &[BufferAccess] {
        &self.checks
    }

    /// Buffer checks plus the implied reads of view parents, in lookup order.
    pub fn buffer_reads(&self) -> &[BufferAccess] {
        &self.reads
    }

    /// Buffers touched by the path, including parents of views.
    pub fn buffers(&self) -> BTreeSet<BufferId> {
        self.reads.iter().map(|a| a.buffer).collect()
    }

    /// Returns whether the path touches `buffer`.
    pub fn contains_buffer(&self, buffer: BufferId) -> bool {
        self.reads.iter().any(|a| a.buffer == buffer)
    }

    /// First checked event on `buffer`, if the path checks it.
    pub fn event(&self, buffer: BufferId) -> Option<BufferEvent> {
        self.events.get(&buffer).copied()
    }

    /// Accesses to the parent buffer implied by a view access.
    pub fn parent_access(&self, access: &BufferAccess) -> Option<BufferAccess> {
        self.parents.get(access).copied()
    }

    /// View accesses whose parent access is `access`.
    pub fn child_accesses(&self, access: &BufferAccess) -> Vec<BufferAccess> {
        self.parents
            .iter()
            .filter(|(_, parent)| *parent == access)
            .map(|(child, _)| *child)
            .collect()
    }

    /// Variables read but never assigned, in slot 0.
    pub const fn free_variables(&self) -> &BTreeSet<SymVar> {
        &self.free
    }

    /// Region restrictions met along the path.
    pub const fn regions(&self) -> &BTreeSet<String> {
        &self.regions
    }

    /// Symbolic-execution result of the path, computed once.
    pub fn symbolic(&self, subsystem: &Subsystem) -> &SymbolicResult {
        self.symbolic
            .get_or_init(|| SymbolicExecutor::new(subsystem).execute_path(self))
    }
}

impl PartialEq for AccessPath {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for AccessPath {}

impl Hash for AccessPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.hash(state);
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, a) in self.checks.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "#{}:{:?}@{}", a.buffer.0, a.event, a.frame())?;
        }
        write!(f, "]")
    }
}

/// Accumulates path entries and derives the path's sets.
#[derive(Debug)]
pub struct AccessPathBuilder<'a> {
    subsystem: &'a Subsystem,
    entries: Vec<PathEntry>,
}

impl<'a> AccessPathBuilder<'a> {
    /// Creates an empty builder.
    pub const fn new(subsystem: &'a Subsystem) -> Self {
        Self {
            subsystem,
            entries: Vec::new(),
        }
    }

    /// Appends a step.
    pub fn push(&mut self, entry: PathEntry) {
        self.entries.push(entry);
    }

    /// Appends a plain transition taken in `frame`.
    pub fn transition(&mut self, transition: TransitionId, frame: u32) {
        self.push(PathEntry::Transition { transition, frame });
    }

    /// Number of steps so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no step was added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes the last step.
    pub fn pop(&mut self) -> Option<PathEntry> {
        self.entries.pop()
    }

    /// Builds the path, deriving all cached sets.
    pub fn build(&self) -> AccessPath {
        let mut walk = Walk::new(self.subsystem);
        walk.enter(self.subsystem.start(), 0);
        for entry in &self.entries {
            walk.step(entry);
        }
        walk.link_views();
        let free = walk
            .read
            .difference(&walk.written)
            .copied()
            .collect::<BTreeSet<_>>();
        AccessPath {
            entries: self.entries.clone(),
            actions: walk.actions,
            addresses: walk.addresses,
            checks: walk.checks,
            reads: walk.reads,
            parents: walk.parents,
            events: walk.events,
            free,
            regions: walk.regions,
            symbolic: OnceLock::new(),
        }
    }
}

struct Walk<'a> {
    subsystem: &'a Subsystem,
    actions: Vec<(ActionId, u32)>,
    addresses: BTreeSet<AddressInstance>,
    checks: Vec<BufferAccess>,
    reads: Vec<BufferAccess>,
    parents: BTreeMap<BufferAccess, BufferAccess>,
    events: BTreeMap<BufferId, BufferEvent>,
    read: BTreeSet<SymVar>,
    written: BTreeSet<SymVar>,
    regions: BTreeSet<String>,
}

impl<'a> Walk<'a> {
    fn new(subsystem: &'a Subsystem) -> Self {
        Self {
            subsystem,
            actions: Vec::new(),
            addresses: BTreeSet::new(),
            checks: Vec::new(),
            reads: Vec::new(),
            parents: BTreeMap::new(),
            events: BTreeMap::new(),
            read: BTreeSet::new(),
            written: BTreeSet::new(),
            regions: BTreeSet::new(),
        }
    }

    fn use_var(&mut self, var: SymVar, written: bool) {
        if let Some(address) = self.subsystem.address_of_var(var.var) {
            let _ = self.addresses.insert(AddressInstance::new(address, var.frame));
        }
        let _ = if written {
            self.written.insert(var)
        } else {
            self.read.insert(var)
        };
    }

    fn use_field(&mut self, field: &Field, frame: u32, written: bool) {
        self.use_var(SymVar::new(0, field.var, frame), written);
    }

    fn use_expr(&mut self, expr: &Expression, frame: u32) {
        for f in expr.fields() {
            self.use_field(f, frame, false);
        }
    }

    fn enter(&mut self, action: ActionId, frame: u32) {
        let subsystem = self.subsystem;
        self.actions.push((action, frame));
        for a in &subsystem.action(action).assignments {
            self.use_field(&a.lhs, frame, true);
            if let Rhs::Expr(expr) = &a.rhs {
                self.use_expr(expr, frame);
            }
        }
    }

    fn guard(&mut self, transition: TransitionId, frame: u32) {
        let subsystem = self.subsystem;
        let guard = &subsystem.transition(transition).guard;
        if let Some(condition) = &guard.condition {
            for atom in &condition.atoms {
                self.use_expr(&atom.expr, frame);
            }
        }
        if let Some(region) = &guard.region {
            let _ = self.regions.insert(region.clone());
        }
        if let Some((buffer, event)) = guard.buffer {
            let b = subsystem.buffer(buffer);
            let instance = AddressInstance::new(b.address, frame);
            let access = BufferAccess::new(buffer, event, instance);
            self.use_var(SymVar::new(0, subsystem.address(b.address).var, frame), false);
            for &f in &b.fields {
                self.use_var(SymVar::new(0, f, frame), false);
            }
            if let Some(parent) = b.parent {
                for &f in &subsystem.buffer(parent).fields {
                    self.use_var(SymVar::new(0, f, frame), false);
                }
            }
            self.checks.push(access);
            let _ = self.events.entry(buffer).or_insert(event);
        }
    }

    /// Orders the lookups: a view reuses an explicit check of its parent at the same
    /// address instance anywhere on the path, otherwise a parent read is synthesized
    /// right before the view's first lookup.
    fn link_views(&mut self) {
        let subsystem = self.subsystem;
        let checks = self.checks.clone();
        for &access in &checks {
            if let Some(parent) = subsystem.buffer(access.buffer).parent {
                let explicit = checks
                    .iter()
                    .chain(self.reads.iter())
                    .find(|r| r.buffer == parent && r.address == access.address)
                    .copied();
                let parent_access = explicit.unwrap_or_else(|| {
                    let synthesized = BufferAccess::new(parent, BufferEvent::Read, access.address);
                    self.reads.push(synthesized);
                    synthesized
                });
                let _ = self.parents.insert(access, parent_access);
            }
            self.reads.push(access);
        }
    }

    fn step(&mut self, entry: &PathEntry) {
        let subsystem = self.subsystem;
        match *entry {
            PathEntry::Transition { transition, frame } => {
                self.guard(transition, frame);
                self.enter(subsystem.transition(transition).target, frame);
            }
            PathEntry::Call {
                transition,
                caller,
                callee,
            } => {
                self.guard(transition, caller);
                if let Some(call) = &subsystem.transition(transition).call {
                    self.use_expr(&call.actual, caller);
                    let formal = subsystem.address(call.formal).var;
                    self.use_var(SymVar::new(0, formal, callee), true);
                    self.enter(call.procedure, callee);
                }
            }
            PathEntry::Return {
                transition,
                callee,
                caller,
            } => {
                let t = subsystem.transition(transition);
                if let Some(result) = t.call.as_ref().and_then(|c| c.result) {
                    self.use_field(&result.callee, callee, false);
                    self.use_field(&result.caller, caller, true);
                }
                self.enter(t.target, caller);
            }
        }
    }
}

//! Structure solver.
//!
//! Resolves one accepted structure into concrete values, access by access. For access `j`
//! the solver runs two passes:
//! 1. **Address pass:** Picks a region, aligns the address, ties page offsets, applies the
//!    hazard conditions against the already solved accesses, keeps missing tags away from
//!    the tags already in their set and solves the path. Buffer lookups are then resolved:
//!    entries of non-replaceable buffers are allocated or shared, hits are primed by loads,
//!    misses are forced by flushing the set, and a replaced tag is computed by replaying the
//!    loads through the buffer's replacement policy.
//! 2. **Fill pass:** Solves the path again with every address fixed and writes the
//!    unpinned fields of the entries the access uses.
//!
//! Once every access is resolved, the loads and then the accesses are replayed through each
//! replaceable buffer: later loads must not turn an earlier miss into a hit, evict a primed
//! tag or move a replaced tag.
//!
//! Flushes use tags issued by the address allocator, which are assumed absent from the
//! buffers before the test runs.
//!
//! Any unsatisfiable step aborts the structure with [`SolverResult::Unsat`]; structures are
//! never partially retried.

/// Per-access solved values.
pub mod address_object;
/// Entries of non-replaceable buffers.
pub mod entry;
/// Preparation loads.
pub mod loader;
/// Replacement policies of the state tracker.
pub mod policies;
/// Solutions.
pub mod solution;
/// Buffer state tracking.
pub mod tracker;

pub use address_object::AddressObject;
pub use entry::EntryObject;
pub use loader::{Load, Loader};
pub use solution::Solution;
pub use tracker::BufferStateTracker;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::access::dependency::UnitedDependency;
use crate::access::hazard::{Hazard, HazardType};
use crate::access::path::{AccessPath, AddressInstance, BufferAccess};
use crate::access::structure::Structure;
use crate::allocator::Allocators;
use crate::common::{bits, DataType, Randomizer};
use crate::config::{GeneratorSettings, RegionKind, RegionSettings};
use crate::model::{AddressId, Buffer, BufferEvent, BufferId, Subsystem};
use crate::symbolic::constraints::{fix, integer_clause, range_clause, whole};
use crate::symbolic::formula::{Clause, Equation, Formula, Operand, SymVar, Term};
use crate::symbolic::solver::{BitSolver, Initializer, Valuation};

/// Outcome of solving a structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverResult {
    /// The structure is realizable.
    Sat(Solution),
    /// The structure cannot be realized.
    Unsat {
        /// First violated constraint.
        reason: String,
    },
}

impl SolverResult {
    /// Returns whether a solution was found.
    pub const fn is_sat(&self) -> bool {
        matches!(self, Self::Sat(_))
    }

    /// The solution, if any.
    pub const fn solution(&self) -> Option<&Solution> {
        match self {
            Self::Sat(s) => Some(s),
            Self::Unsat { .. } => None,
        }
    }

    /// Consumes the result, returning the solution if any.
    pub fn into_solution(self) -> Option<Solution> {
        match self {
            Self::Sat(s) => Some(s),
            Self::Unsat { .. } => None,
        }
    }

    /// Reason of unsatisfiability, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Sat(_) => None,
            Self::Unsat { reason } => Some(reason),
        }
    }
}

/// Progress of the solver on the current structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverState {
    /// No structure started.
    #[default]
    Init,
    /// Resolving the addresses and lookups of access `j`.
    AddressPass(usize),
    /// Writing the entry fields used by access `j`.
    FillPass(usize),
    /// Replaying the loads and lookups through the replaceable buffers.
    Replay,
    /// The last structure was solved.
    Sat,
    /// The last structure was infeasible.
    Unsat,
}

impl fmt::Display for SolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "Init"),
            Self::AddressPass(j) => write!(f, "Solve[{j}]"),
            Self::FillPass(j) => write!(f, "Fill[{j}]"),
            Self::Replay => write!(f, "Replay"),
            Self::Sat => write!(f, "Sat"),
            Self::Unsat => write!(f, "Unsat"),
        }
    }
}

/// Reason of an unsatisfiable step.
type Step<T = ()> = std::result::Result<T, String>;

/// Solves structures against a subsystem and generator settings.
#[derive(Debug)]
pub struct MemorySolver<'a> {
    subsystem: &'a Subsystem,
    settings: &'a GeneratorSettings,
    normal_paths: &'a [Arc<AccessPath>],
    allocators: &'a mut Allocators,
    rng: &'a mut Randomizer,
    state: SolverState,
}

impl<'a> MemorySolver<'a> {
    /// Creates a solver.
    ///
    /// # Arguments
    ///
    /// * `subsystem` - Model the structures are built on.
    /// * `settings` - Regions, page mask and alignment.
    /// * `normal_paths` - Plain load paths, used to fill entries that only loads go through.
    /// * `allocators` - Address and entry id allocators, reset for every structure.
    /// * `rng` - Randomizer.
    pub const fn new(
        subsystem: &'a Subsystem,
        settings: &'a GeneratorSettings,
        normal_paths: &'a [Arc<AccessPath>],
        allocators: &'a mut Allocators,
        rng: &'a mut Randomizer,
    ) -> Self {
        Self {
            subsystem,
            settings,
            normal_paths,
            allocators,
            rng,
            state: SolverState::Init,
        }
    }

    /// Current state.
    pub const fn state(&self) -> SolverState {
        self.state
    }

    /// Solves `structure`.
    pub fn solve(&mut self, structure: &Structure) -> SolverResult {
        self.allocators.reset();
        let mut run = Run {
            subsystem: self.subsystem,
            settings: self.settings,
            normal_paths: self.normal_paths,
            structure,
            allocators: &mut *self.allocators,
            rng: &mut *self.rng,
            state: SolverState::Init,
            objects: vec![AddressObject::new(); structure.len()],
            formulas: vec![Formula::new(); structure.len()],
            regions: vec![BTreeMap::new(); structure.len()],
            entries: Vec::new(),
            loader: Loader::new(),
            hits: BTreeMap::new(),
            replaced: BTreeSet::new(),
        };
        let outcome = run.execute();
        self.state = run.state;
        match outcome {
            Ok(()) => {
                self.state = SolverState::Sat;
                debug!(
                    accesses = structure.len(),
                    entries = run.entries.len(),
                    loads = run.loader.len(),
                    "structure solved"
                );
                SolverResult::Sat(Solution::new(
                    structure.clone(),
                    run.objects,
                    run.entries,
                    run.loader,
                ))
            }
            Err(reason) => {
                debug!(state = %self.state, %reason, "structure unsatisfiable");
                self.state = SolverState::Unsat;
                SolverResult::Unsat { reason }
            }
        }
    }
}

/// A primed tag: the address loaded and the parent entry it went through.
#[derive(Debug, Clone, Copy)]
struct Primed {
    address: u64,
    entry: Option<usize>,
}

/// Solving state of one structure.
struct Run<'r> {
    subsystem: &'r Subsystem,
    settings: &'r GeneratorSettings,
    normal_paths: &'r [Arc<AccessPath>],
    structure: &'r Structure,
    allocators: &'r mut Allocators,
    rng: &'r mut Randomizer,
    state: SolverState,
    objects: Vec<AddressObject>,
    formulas: Vec<Formula>,
    regions: Vec<BTreeMap<AddressId, RegionSettings>>,
    entries: Vec<EntryObject>,
    loader: Loader,
    /// Tags primed per `(buffer, index)`.
    hits: BTreeMap<(BufferId, u64), BTreeMap<u64, Primed>>,
    /// Sets already evicted.
    replaced: BTreeSet<(BufferId, u64)>,
}

impl<'r> Run<'r> {
    fn execute(&mut self) -> Step {
        for j in 0..self.structure.len() {
            self.state = SolverState::AddressPass(j);
            debug!("{}", self.state);
            self.address_pass(j)?;
            self.state = SolverState::FillPass(j);
            debug!("{}", self.state);
            self.fill_pass(j)?;
        }
        self.state = SolverState::Replay;
        debug!("{}", self.state);
        self.replay()
    }

    fn path(&self, j: usize) -> &'r AccessPath {
        self.structure.access(j).path()
    }

    fn address_of(&self, j: usize, instance: &AddressInstance) -> Step<u64> {
        self.objects[j]
            .address(instance)
            .ok_or_else(|| format!("address {} of access {j} is unsolved", instance.address.0))
    }

    fn address_var(&self, instance: &AddressInstance, slot: u32) -> SymVar {
        SymVar::new(slot, self.subsystem.address(instance.address).var, instance.frame)
    }

    fn address_pass(&mut self, j: usize) -> Step {
        let subsystem = self.subsystem;
        let structure = self.structure;
        let access = structure.access(j);
        let path = access.path();
        let symbolic = path.symbolic(subsystem);
        if let Some(reason) = symbolic.conflict_reason() {
            return Err(format!("access {j}: {reason}"));
        }
        let slot = j as u32;
        let mut formula = symbolic.formula().with_slot(slot);
        for constraint in &access.constraints().integers {
            formula.push(integer_clause(subsystem, constraint, slot).map_err(|e| e.to_string())?);
        }
        self.layout_constraints(j, access.ty().data_type, &mut formula)?;
        let united = structure.united_dependency(j);
        self.hazard_constraints(j, &united, &mut formula);
        self.miss_exclusions(j, &united, &mut formula);
        trace!(access = j, clauses = formula.len(), "address formula");

        let valuation = self.solve_formula(j, &formula, "Address constraint violation")?;
        self.formulas[j] = formula;
        self.bind(j, &valuation);

        for lookup in path.buffer_reads() {
            let buffer = subsystem.buffer(lookup.buffer);
            if buffer.replaceable {
                if let Some((i, hazard)) = united.tag_replaced_relation(lookup) {
                    self.replace_constraint(j, lookup, i, &hazard)?;
                }
            }
        }
        for lookup in path.buffer_reads() {
            if !subsystem.buffer(lookup.buffer).replaceable {
                self.entry_constraint(j, lookup, &united)?;
            }
        }
        for lookup in path.buffer_reads() {
            if subsystem.buffer(lookup.buffer).replaceable {
                if lookup.event.resolved() == BufferEvent::Miss {
                    self.miss_constraint(j, lookup, &united)?;
                } else {
                    self.hit_constraint(j, lookup, &united)?;
                }
            }
        }
        Ok(())
    }

    /// Region bounds, alignment and page-offset tie of the top-level addresses.
    fn layout_constraints(&mut self, j: usize, data_type: DataType, formula: &mut Formula) -> Step {
        let subsystem = self.subsystem;
        let path = self.path(j);
        let slot = j as u32;
        let top = |id: AddressId| path.contains_address(&AddressInstance::new(id, 0)).then_some(id);
        let va = subsystem.virtual_address().and_then(top);
        let pa = subsystem.physical_address().and_then(top);

        for (address, kind) in [(va, RegionKind::Virtual), (pa, RegionKind::Physical)] {
            let Some(address) = address else { continue };
            if let Some(region) = self.choose_region(path, kind)? {
                let var = subsystem.address(address).var;
                formula.push(range_clause(whole(subsystem, var, slot, 0), region.min, region.max));
                trace!(access = j, region = %region.name, "region chosen");
                let _ = self.regions[j].insert(address, region);
            }
        }

        let preferred = self.settings.align.map_or(0, DataType::align_bits);
        if let Some(address) = va.or(pa) {
            let align = data_type.align_bits().max(preferred).min(subsystem.address_width(address));
            if align > 0 {
                let var = SymVar::new(slot, subsystem.address(address).var, 0);
                formula.push(Clause::term_equals(Term::new(var, 0, align - 1), 0));
            }
        }

        if let (Some(va), Some(pa)) = (va, pa) {
            let page = bits::low_mask_width(self.settings.page_mask)
                .min(subsystem.address_width(va))
                .min(subsystem.address_width(pa));
            if va != pa && page > 0 {
                let v = SymVar::new(slot, subsystem.address(va).var, 0);
                let p = SymVar::new(slot, subsystem.address(pa).var, 0);
                formula.push(Clause::Equation(Equation::equality(
                    Term::new(v, 0, page - 1),
                    Operand::Term(Term::new(p, 0, page - 1)),
                )));
            }
        }
        Ok(())
    }

    /// Picks an enabled region of `kind`, restricted to the regions the path names.
    fn choose_region(&mut self, path: &AccessPath, kind: RegionKind) -> Step<Option<RegionSettings>> {
        let of_kind: Vec<&RegionSettings> =
            self.settings.regions.iter().filter(|r| r.kind == kind).collect();
        if of_kind.is_empty() {
            return Ok(None);
        }
        let named = of_kind.iter().any(|r| path.regions().contains(&r.name));
        let candidates: Vec<&RegionSettings> = of_kind
            .into_iter()
            .filter(|r| r.enabled && (!named || path.regions().contains(&r.name)))
            .collect();
        self.rng
            .choose(&candidates)
            .map(|r| Some((*r).clone()))
            .ok_or_else(|| format!("no enabled {kind:?} region applies"))
    }

    /// Conditions implied by the hazards of access `j` against the solved accesses.
    fn hazard_constraints(&self, j: usize, united: &UnitedDependency, formula: &mut Formula) {
        let subsystem = self.subsystem;
        let slot = j as u32;
        for (lookup, hazards) in united.buffer_hazards() {
            for ty in hazards.types() {
                for (i, hazard) in hazards.relation(ty) {
                    if let Some(primary) = self.objects[*i].address(&hazard.primary.address) {
                        formula.push(hazard.condition_against(subsystem, slot, primary));
                    }
                }
            }
            let buffer = subsystem.buffer(lookup.buffer);
            if buffer.replaceable {
                continue;
            }
            // A shared entry also shares its fields.
            if let Some((i, hazard)) = united.tag_equal_relation(lookup).first() {
                if let Some(e) = self.entry_of(*i, &hazard.primary, lookup.buffer) {
                    for &field in &buffer.fields {
                        if let Some(value) = self.entries[e].field(field) {
                            formula.push(fix(subsystem, SymVar::new(slot, field, lookup.frame()), value));
                        }
                    }
                }
            }
        }
    }

    /// A miss not bound to a replaced tag cannot look up a tag that already entered its set.
    fn miss_exclusions(&self, j: usize, united: &UnitedDependency, formula: &mut Formula) {
        let subsystem = self.subsystem;
        let slot = j as u32;
        for lookup in self.path(j).buffer_reads() {
            let buffer = subsystem.buffer(lookup.buffer);
            if !buffer.replaceable
                || lookup.event.resolved() != BufferEvent::Miss
                || united.tag_replaced_relation(lookup).is_some()
            {
                continue;
            }
            for (index, tag) in self.entered(j, lookup.buffer) {
                formula.push(Clause::Or(vec![
                    Clause::expr_differs(&buffer.index, slot, lookup.frame(), index),
                    Clause::expr_differs(&buffer.tag, slot, lookup.frame(), tag),
                ]));
            }
        }
    }

    /// `(index, tag)` pairs of `buffer` brought in by the loads so far and by the solved
    /// lookups of accesses `0..=j`.
    fn entered(&self, j: usize, buffer: BufferId) -> BTreeSet<(u64, u64)> {
        let b = self.subsystem.buffer(buffer);
        let mut addresses: Vec<u64> = self.loader.loads_of(b.address).map(|l| l.address).collect();
        for k in 0..=j {
            for check in self.path(k).buffer_checks() {
                if check.buffer == buffer {
                    addresses.extend(self.objects[k].address(&check.address));
                }
            }
        }
        addresses.into_iter().map(|a| (b.index_of(a), b.tag_of(a))).collect()
    }

    fn solve_formula(&mut self, j: usize, formula: &Formula, violation: &str) -> Step<Valuation> {
        let slot = j as u32;
        let path = self.path(j);
        let extra: BTreeSet<SymVar> = path
            .symbolic(self.subsystem)
            .variables()
            .iter()
            .map(|v| SymVar::new(slot, v.var, v.frame))
            .collect();
        BitSolver::new(self.subsystem)
            .solve(formula, &extra, Initializer::Random, self.rng)
            .ok_or_else(|| format!("{violation}: access {j} is unsatisfiable"))
    }

    /// Stores the values of access `j`.
    fn bind(&mut self, j: usize, valuation: &Valuation) {
        let slot = j as u32;
        for instance in self.path(j).address_instances() {
            let value = valuation.value(self.address_var(instance, slot));
            self.objects[j].set_address(*instance, value);
        }
        self.objects[j].set_values(
            valuation
                .iter()
                .filter(|(v, _)| v.slot == slot)
                .map(|(v, value)| (*v, *value))
                .collect(),
        );
    }

    /// Entry of `buffer` used by `lookup` of access `i`; a view lookup resolves to the
    /// entry of its parent lookup.
    fn entry_of(&self, i: usize, lookup: &BufferAccess, buffer: BufferId) -> Option<usize> {
        let object = &self.objects[i];
        if lookup.buffer == buffer {
            object.entry(lookup)
        } else {
            self.path(i)
                .parent_access(lookup)
                .filter(|p| p.buffer == buffer)
                .and_then(|p| object.entry(&p))
        }
    }

    /// Existing entry of `buffer` keyed like `address`.
    fn find_entry(&self, buffer: BufferId, address: u64) -> Option<usize> {
        let b = self.subsystem.buffer(buffer);
        self.entries.iter().position(|e| {
            e.buffer() == buffer && e.address().is_some_and(|a| same_key(b, a, address))
        })
    }

    fn refer(&mut self, j: usize, lookup: BufferAccess, entry: usize) {
        self.objects[j].set_entry(lookup, entry);
        self.entries[entry].add_referrer(j);
    }

    /// Non-replaceable lookup: share the entry of a tag-equal lookup or allocate one.
    fn entry_constraint(&mut self, j: usize, lookup: &BufferAccess, united: &UnitedDependency) -> Step {
        let buffer = self.subsystem.buffer(lookup.buffer);
        let address = self.address_of(j, &lookup.address)?;
        if lookup.event == BufferEvent::Miss {
            if self.find_entry(lookup.buffer, address).is_some() {
                return Err(format!(
                    "Entry constraint violation: {} holds {address:#x} looked up as a miss",
                    buffer.name
                ));
            }
            return Ok(());
        }
        if let Some((i, hazard)) = united.tag_equal_relation(lookup).first() {
            if let Some(e) = self.entry_of(*i, &hazard.primary, lookup.buffer) {
                debug!(access = j, buffer = %buffer.name, source = i, "entry shared");
                self.refer(j, *lookup, e);
                return Ok(());
            }
        }
        if united.child_tag_replaced(lookup) && self.objects[j].entry(lookup).is_some() {
            return Ok(());
        }
        if let Some(e) = self.find_entry(lookup.buffer, address) {
            self.refer(j, *lookup, e);
            return Ok(());
        }
        let id = self
            .allocators
            .entries
            .allocate(self.subsystem, lookup.buffer, self.rng)
            .map_err(|e| format!("Entry constraint violation: {e}"))?;
        let mut entry = EntryObject::new(id, *lookup);
        entry.set_address(address);
        self.entries.push(entry);
        debug!(access = j, buffer = %buffer.name, id, address, "entry allocated");
        self.refer(j, *lookup, self.entries.len() - 1);
        Ok(())
    }

    /// Entry of the parent lookup of a view lookup, if the parent keeps entries.
    fn parent_entry(&self, j: usize, lookup: &BufferAccess) -> Option<usize> {
        self.path(j)
            .parent_access(lookup)
            .and_then(|p| self.objects[j].entry(&p))
    }

    /// Replaceable hit: prime the tag unless an earlier access already brought it in.
    fn hit_constraint(&mut self, j: usize, lookup: &BufferAccess, united: &UnitedDependency) -> Step {
        let subsystem = self.subsystem;
        let buffer = subsystem.buffer(lookup.buffer);
        if !united.relation(lookup, HazardType::TagEqual).is_empty() {
            return Ok(());
        }
        let address = self.address_of(j, &lookup.address)?;
        let key = (lookup.buffer, buffer.index_of(address));
        let tag = buffer.tag_of(address);
        if self.hits.get(&key).is_some_and(|primed| primed.contains_key(&tag)) {
            return Ok(());
        }
        let primed = self.hits.get(&key).map_or(0, BTreeMap::len);
        let flushed = self.replaced.contains(&key);
        if primed >= buffer.policy.hit_capacity(buffer.ways, flushed) {
            if flushed || primed >= buffer.policy.hit_capacity(buffer.ways, true) {
                return Err(format!(
                    "Hit constraint violation: {primed} tags already primed in {} set {:#x}",
                    buffer.name, key.1
                ));
            }
            // A flushed set keeps more primed tags resident.
            self.flush(j, lookup.buffer, address)?;
        }
        let entry = self.parent_entry(j, lookup);
        let _ = self
            .hits
            .entry(key)
            .or_default()
            .insert(tag, Primed { address, entry });
        debug!(access = j, buffer = %buffer.name, address, "hit load");
        self.load(lookup.buffer, BufferEvent::Hit, address, entry);

        // The load also went through the buffers checked before this one.
        let checks = self.path(j).buffer_checks();
        let position = checks.iter().position(|c| c == lookup).unwrap_or(checks.len());
        let earlier: Vec<BufferAccess> = checks[..position]
            .iter()
            .filter(|c| {
                c.address == lookup.address
                    && c.buffer != lookup.buffer
                    && c.event == BufferEvent::Miss
                    && subsystem.buffer(c.buffer).replaceable
            })
            .copied()
            .collect();
        for miss in earlier {
            let b = subsystem.buffer(miss.buffer);
            let _ = self.replaced.remove(&(miss.buffer, b.index_of(address)));
            self.miss_constraint(j, &miss, united)?;
        }
        Ok(())
    }

    fn load(&mut self, buffer: BufferId, event: BufferEvent, address: u64, entry: Option<usize>) {
        if let Some(e) = entry {
            self.entries[e].add_load();
        }
        self.loader.add_load(Load {
            buffer,
            event,
            address_type: self.subsystem.buffer(buffer).address,
            address,
            entry,
        });
    }

    /// Replaceable miss: flush the set unless an earlier miss already did.
    fn miss_constraint(&mut self, j: usize, lookup: &BufferAccess, united: &UnitedDependency) -> Step {
        let buffer = self.subsystem.buffer(lookup.buffer);
        if !united.relation(lookup, HazardType::TagEqual).is_empty() {
            return Err(format!(
                "Miss constraint violation: {} misses on a tag an earlier access brought in",
                buffer.name
            ));
        }
        let address = self.address_of(j, &lookup.address)?;
        let key = (lookup.buffer, buffer.index_of(address));
        let tag = buffer.tag_of(address);
        if self.hits.get(&key).is_some_and(|primed| primed.contains_key(&tag)) {
            return Err(format!(
                "Miss constraint violation: {} misses on primed tag {tag:#x}",
                buffer.name
            ));
        }
        if self.replaced.contains(&key) {
            return Ok(());
        }
        self.flush(j, lookup.buffer, address)
    }

    /// Evicts the set of `address` with fresh tags, then re-primes its hit tags.
    ///
    /// The fresh tags avoid every tag that entered the set so far, the primed ones and the
    /// tag of `address`.
    fn flush(&mut self, j: usize, id: BufferId, address: u64) -> Step {
        let subsystem = self.subsystem;
        let buffer = subsystem.buffer(id);
        let index = buffer.index_of(address);
        let Some(length) = buffer.policy.flush_length(buffer.ways) else {
            return Err(format!(
                "Miss constraint violation: {:?} set {index:#x} of {} cannot be flushed",
                buffer.policy, buffer.name
            ));
        };
        let _ = self.replaced.insert((id, index));
        let primed = self.hits.get(&(id, index)).cloned().unwrap_or_default();
        let region = self.regions[j].get(&buffer.address).cloned();
        let mut exclude: BTreeSet<u64> = self
            .entered(j, id)
            .into_iter()
            .filter(|&(i, _)| i == index)
            .map(|(_, tag)| tag)
            .collect();
        exclude.extend(primed.keys().copied());
        let _ = exclude.insert(buffer.tag_of(address));
        debug!(access = j, buffer = %buffer.name, index, length, "miss evictions");
        for _ in 0..length {
            let evicting = self
                .allocators
                .addresses
                .allocate_tag(subsystem, id, address, region.as_ref(), &exclude, self.rng)
                .map_err(|e| format!("Miss constraint violation: {e}"))?;
            let _ = exclude.insert(buffer.tag_of(evicting));
            let entry = match buffer.parent {
                Some(parent) if !subsystem.buffer(parent).replaceable => {
                    Some(self.auxiliary_entry(parent, evicting)?)
                }
                _ => None,
            };
            self.load(id, BufferEvent::Miss, evicting, entry);
        }
        for p in primed.values() {
            self.load(id, BufferEvent::Hit, p.address, p.entry);
        }
        Ok(())
    }

    /// Entry of the non-replaceable `parent` that an evicting load at `address` goes
    /// through; created and filled through a plain load path when missing.
    fn auxiliary_entry(&mut self, parent: BufferId, address: u64) -> Step<usize> {
        if let Some(e) = self.find_entry(parent, address) {
            return Ok(e);
        }
        let subsystem = self.subsystem;
        let b = subsystem.buffer(parent);
        let id = self
            .allocators
            .entries
            .allocate(subsystem, parent, self.rng)
            .map_err(|e| format!("Entry constraint violation: {e}"))?;
        let lookup = BufferAccess::new(parent, BufferEvent::Read, AddressInstance::new(b.address, 0));
        let mut entry = EntryObject::new(id, lookup);
        entry.set_address(address);
        self.fill_auxiliary(&mut entry, address)?;
        trace!(buffer = %b.name, id, address, "auxiliary entry");
        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    fn fill_auxiliary(&mut self, entry: &mut EntryObject, address: u64) -> Step {
        let subsystem = self.subsystem;
        let parent = entry.buffer();
        let b = subsystem.buffer(parent);
        // A slot no access of the structure uses.
        let slot = self.structure.len() as u32;
        for path in self.normal_paths {
            let Some(read) = path
                .buffer_reads()
                .iter()
                .find(|r| r.buffer == parent && r.event.resolved() == BufferEvent::Hit)
            else {
                continue;
            };
            let symbolic = path.symbolic(subsystem);
            if symbolic.is_conflict() {
                continue;
            }
            let mut formula = symbolic.formula().with_slot(slot);
            formula.push(fix(subsystem, self.address_var(&read.address, slot), address));
            let extra: BTreeSet<SymVar> = b
                .fields
                .iter()
                .map(|&f| SymVar::new(slot, f, read.frame()))
                .collect();
            if let Some(valuation) =
                BitSolver::new(subsystem).solve(&formula, &extra, Initializer::Random, self.rng)
            {
                for &f in &b.fields {
                    let _ = entry.set_field(f, valuation.value(SymVar::new(slot, f, read.frame())));
                }
                return Ok(());
            }
        }
        Err(format!(
            "Entry constraint violation: no load path fills {} at {address:#x}",
            b.name
        ))
    }

    /// TAG_REPLACED: bind the lookup to the tag evicted by the primary miss.
    fn replace_constraint(&mut self, j: usize, lookup: &BufferAccess, i: usize, hazard: &Hazard) -> Step {
        let subsystem = self.subsystem;
        let buffer = subsystem.buffer(lookup.buffer);
        let primary = self.address_of(i, &hazard.primary.address)?;
        let flushed = self.replaced.contains(&(lookup.buffer, buffer.index_of(primary)));
        if !buffer.policy.replays_exactly(flushed) {
            return Err(format!(
                "Replace constraint violation: {:?} victims of {} cannot be replayed",
                buffer.policy, buffer.name
            ));
        }
        let mut tracker = BufferStateTracker::new(buffer);
        for load in self.loader.loads_of(buffer.address) {
            let _ = tracker.track(load.address);
        }
        for k in 0..i {
            for check in self.path(k).buffer_checks() {
                if check.buffer == lookup.buffer {
                    let _ = tracker.track(self.address_of(k, &check.address)?);
                }
            }
        }
        let Some(tag) = tracker.track(primary) else {
            return Err(format!(
                "Replace constraint violation: access {i} evicts nothing from {}",
                buffer.name
            ));
        };
        let rebound = buffer.with_tag(self.address_of(j, &lookup.address)?, tag);
        debug!(access = j, buffer = %buffer.name, source = i, tag, address = rebound, "tag replaced");

        let slot = j as u32;
        let mut formula = self.formulas[j].clone();
        formula.push(fix(subsystem, self.address_var(&lookup.address, slot), rebound));
        let valuation = self.solve_formula(j, &formula, "Replace constraint violation")?;
        self.formulas[j] = formula;
        self.bind(j, &valuation);

        if let Some(parent) = buffer.parent.filter(|&p| !subsystem.buffer(p).replaceable) {
            let Some(parent_lookup) = self.path(j).parent_access(lookup) else {
                return Ok(());
            };
            let Some(e) = self.find_entry(parent, rebound) else {
                return Err(format!(
                    "Replace constraint violation: no {} entry holds the replaced tag",
                    subsystem.buffer(parent).name
                ));
            };
            self.refer(j, parent_lookup, e);
        }
        Ok(())
    }

    /// Writes the unpinned fields of every entry access `j` uses.
    fn fill_pass(&mut self, j: usize) -> Step {
        let subsystem = self.subsystem;
        let slot = j as u32;
        let used: Vec<(BufferAccess, usize)> =
            self.objects[j].entries().iter().map(|(l, e)| (*l, *e)).collect();
        if used.is_empty() {
            return Ok(());
        }
        let mut formula = self.formulas[j].clone();
        for (instance, value) in self.objects[j].addresses() {
            formula.push(fix(subsystem, self.address_var(instance, slot), *value));
        }
        for (lookup, e) in &used {
            let entry = &self.entries[*e];
            for (&field, &value) in entry.fields() {
                formula.push(fix(subsystem, SymVar::new(slot, field, lookup.frame()), value));
            }
        }
        let valuation = self.solve_formula(j, &formula, "Fill constraint violation")?;
        for (lookup, e) in used {
            let fields = subsystem.buffer(self.entries[e].buffer()).fields.clone();
            for field in fields {
                let value = valuation.value(SymVar::new(slot, field, lookup.frame()));
                if self.entries[e].set_field(field, value) {
                    trace!(access = j, id = self.entries[e].id(), field = field.0, value, "field written");
                }
            }
        }
        self.bind(j, &valuation);
        Ok(())
    }

    /// Replays the loads and then the lookups of every access through each replaceable
    /// buffer the structure checks.
    fn replay(&self) -> Step {
        for (id, buffer) in self.subsystem.buffers().iter().enumerate() {
            let id = BufferId(id);
            if buffer.replaceable && (0..self.structure.len()).any(|k| self.path(k).contains_buffer(id)) {
                self.replay_buffer(id, buffer)?;
            }
        }
        Ok(())
    }

    fn replay_buffer(&self, id: BufferId, buffer: &Buffer) -> Step {
        let n = self.structure.len();
        let mut tracker = BufferStateTracker::new(buffer);
        let mut entered: BTreeMap<u64, BTreeSet<u64>> = BTreeMap::new();
        let mut enter = |address: u64| {
            let _ = entered
                .entry(buffer.index_of(address))
                .or_default()
                .insert(buffer.tag_of(address));
        };
        for load in self.loader.loads_of(buffer.address) {
            enter(load.address);
            let _ = tracker.track(load.address);
        }
        let mut evicted: BTreeMap<(usize, BufferAccess), Option<u64>> = BTreeMap::new();
        let mut hit_sets = BTreeSet::new();
        for k in 0..n {
            for check in self.path(k).buffer_checks().iter().filter(|c| c.buffer == id) {
                let address = self.address_of(k, &check.address)?;
                let present = tracker.contains(address);
                let hit = check.event.resolved() == BufferEvent::Hit;
                if hit != present {
                    return Err(format!(
                        "Replay constraint violation: access {k} expects a {:?} in {} at {address:#x}",
                        check.event, buffer.name
                    ));
                }
                if hit {
                    let _ = hit_sets.insert(buffer.index_of(address));
                }
                enter(address);
                let _ = evicted.insert((k, *check), tracker.track(address));
            }
        }
        trace!(buffer = %buffer.name, lookups = evicted.len(), "replayed");

        // Sets the replay cannot predict only keep hits while few enough tags entered them.
        for index in hit_sets {
            let flushed = self.replaced.contains(&(id, index));
            let tags = entered.get(&index).map_or(0, BTreeSet::len);
            let capacity = buffer.policy.hit_capacity(buffer.ways, flushed);
            if !buffer.policy.replays_exactly(flushed) && tags > capacity {
                return Err(format!(
                    "Replay constraint violation: {tags} tags enter {:?} set {index:#x} of {}",
                    buffer.policy, buffer.name
                ));
            }
        }

        let victim = |i: usize, hazard: &Hazard| evicted.get(&(i, hazard.primary)).copied().flatten();
        for j in 0..n {
            let united = self.structure.united_dependency(j);
            for lookup in self.path(j).buffer_checks().iter().filter(|c| c.buffer == id) {
                let tag = buffer.tag_of(self.address_of(j, &lookup.address)?);
                if let Some((i, hazard)) = united.tag_replaced_relation(lookup) {
                    if victim(i, &hazard) != Some(tag) {
                        return Err(format!(
                            "Replay constraint violation: access {i} no longer evicts {tag:#x} from {}",
                            buffer.name
                        ));
                    }
                }
                for (i, hazard) in united.relation(lookup, HazardType::TagNotReplaced) {
                    if victim(i, &hazard) == Some(tag) {
                        return Err(format!(
                            "Replay constraint violation: access {i} evicts tag {tag:#x} from {}",
                            buffer.name
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Returns whether two addresses select the same slot (same index and tag) of `buffer`.
fn same_key(buffer: &Buffer, a: u64, b: u64) -> bool {
    buffer.index_of(a) == buffer.index_of(b) && buffer.tag_of(a) == buffer.tag_of(b)
}

//! The memory subsystem graph and its builder.
//!
//! A subsystem is a graph of actions connected by guarded transitions, plus the
//! variables, addresses and buffers the guards and assignments refer to. All entities are
//! stored in arenas and referenced by index; [`SubsystemBuilder::build`] validates every
//! reference once so that the rest of the engine can index without checks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::buffer::{Buffer, BufferId};
use super::expr::{Expression, Field, VarId, Variable};
use super::guard::Guard;
use crate::common::bits;
use crate::common::{Error, Result};

/// Index of an address in its subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressId(pub usize);

/// Index of an action in its subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub usize);

/// Index of a transition in its subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionId(pub usize);

/// A named address type (virtual address, physical address, ...) backed by a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Unique address name.
    pub name: String,
    /// Variable holding the address value.
    pub var: VarId,
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rhs {
    /// Concatenation of fields.
    Expr(Expression),
    /// Constant.
    Const(u64),
}

/// `lhs = rhs`; a narrower right-hand side is zero-extended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned bits.
    pub lhs: Field,
    /// Assigned value.
    pub rhs: Rhs,
}

impl Assignment {
    /// `lhs = rhs` for an expression.
    pub fn expr(lhs: Field, rhs: impl Into<Expression>) -> Self {
        Self {
            lhs,
            rhs: Rhs::Expr(rhs.into()),
        }
    }

    /// `lhs = value`.
    pub const fn constant(lhs: Field, value: u64) -> Self {
        Self {
            lhs,
            rhs: Rhs::Const(value),
        }
    }
}

/// A node of the graph; its assignments run when the node is entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Unique action name.
    pub name: String,
    /// Assignments executed on entry.
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

/// Binding of a callee's result bits back into the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultBinding {
    /// Bits written in the caller's frame.
    pub caller: Field,
    /// Bits read from the callee's frame.
    pub callee: Field,
}

/// Invocation of a procedure (a sub-graph starting at `procedure`) in a fresh frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Entry action of the callee.
    pub procedure: ActionId,
    /// Address the callee is invoked with.
    pub formal: AddressId,
    /// Caller-side value bound to the formal address.
    pub actual: Expression,
    /// Optional result binding applied on return.
    #[serde(default)]
    pub result: Option<ResultBinding>,
}

/// A guarded edge of the graph.
///
/// When `call` is present, taking the transition enters the callee; once the callee
/// reaches an action without outgoing transitions, execution returns to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Source action.
    pub source: ActionId,
    /// Target action.
    pub target: ActionId,
    /// Enabling condition.
    #[serde(default)]
    pub guard: Guard,
    /// Procedure invoked on the way to `target`.
    #[serde(default)]
    pub call: Option<Call>,
}

impl Transition {
    /// An unconditional transition.
    pub const fn new(source: ActionId, target: ActionId) -> Self {
        Self {
            source,
            target,
            guard: Guard::always(),
            call: None,
        }
    }

    /// A guarded transition.
    pub const fn guarded(source: ActionId, target: ActionId, guard: Guard) -> Self {
        Self {
            source,
            target,
            guard,
            call: None,
        }
    }

    /// Attaches a procedure call.
    #[must_use]
    pub fn with_call(mut self, call: Call) -> Self {
        self.call = Some(call);
        self
    }
}

/// A validated memory subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SubsystemBuilder")]
pub struct Subsystem {
    variables: Vec<Variable>,
    addresses: Vec<Address>,
    buffers: Vec<Buffer>,
    actions: Vec<Action>,
    transitions: Vec<Transition>,
    start: ActionId,
    virtual_address: Option<AddressId>,
    physical_address: Option<AddressId>,
    #[serde(skip)]
    outgoing: Vec<Vec<TransitionId>>,
}

impl Subsystem {
    /// All variables.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The variable `id`.
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    /// Looks up a variable by name.
    pub fn variable_by_name(&self, name: &str) -> Option<VarId> {
        self.variables.iter().position(|v| v.name == name).map(VarId)
    }

    /// All addresses.
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// The address `id`.
    pub fn address(&self, id: AddressId) -> &Address {
        &self.addresses[id.0]
    }

    /// Looks up an address by name.
    pub fn address_by_name(&self, name: &str) -> Option<AddressId> {
        self.addresses.iter().position(|a| a.name == name).map(AddressId)
    }

    /// Width of an address in bits.
    pub fn address_width(&self, id: AddressId) -> u32 {
        self.variable(self.address(id).var).width
    }

    /// All buffers.
    pub fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }

    /// The buffer `id`.
    pub fn buffer(&self, id: BufferId) -> &Buffer {
        &self.buffers[id.0]
    }

    /// Looks up a buffer by name.
    pub fn buffer_by_name(&self, name: &str) -> Option<BufferId> {
        self.buffers.iter().position(|b| b.name == name).map(BufferId)
    }

    /// Views whose parent is `id`.
    pub fn children(&self, id: BufferId) -> Vec<BufferId> {
        (0..self.buffers.len())
            .map(BufferId)
            .filter(|&b| self.buffer(b).parent == Some(id))
            .collect()
    }

    /// The action `id`.
    pub fn action(&self, id: ActionId) -> &Action {
        &self.actions[id.0]
    }

    /// Number of actions.
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// The transition `id`.
    pub fn transition(&self, id: TransitionId) -> &Transition {
        &self.transitions[id.0]
    }

    /// Transitions leaving `action`, in declaration order.
    pub fn outgoing(&self, action: ActionId) -> &[TransitionId] {
        &self.outgoing[action.0]
    }

    /// Entry action of the graph.
    pub const fn start(&self) -> ActionId {
        self.start
    }

    /// Virtual address type, if the subsystem translates addresses.
    pub const fn virtual_address(&self) -> Option<AddressId> {
        self.virtual_address
    }

    /// Physical address type.
    pub const fn physical_address(&self) -> Option<AddressId> {
        self.physical_address
    }

    /// Address backed by `var`, if any.
    pub fn address_of_var(&self, var: VarId) -> Option<AddressId> {
        self.addresses.iter().position(|a| a.var == var).map(AddressId)
    }
}

/// Incremental, unvalidated form of a [`Subsystem`].
///
/// Entities are appended and referenced by the returned ids; [`SubsystemBuilder::build`]
/// checks the whole graph. The builder is also the JSON shape of a subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubsystemBuilder {
    #[serde(default)]
    variables: Vec<Variable>,
    #[serde(default)]
    addresses: Vec<Address>,
    #[serde(default)]
    buffers: Vec<Buffer>,
    #[serde(default)]
    actions: Vec<Action>,
    #[serde(default)]
    transitions: Vec<Transition>,
    #[serde(default)]
    start: Option<ActionId>,
    #[serde(default)]
    virtual_address: Option<AddressId>,
    #[serde(default)]
    physical_address: Option<AddressId>,
}

impl SubsystemBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a variable.
    pub fn variable(&mut self, name: impl Into<String>, width: u32) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            width,
        });
        VarId(self.variables.len() - 1)
    }

    /// Declares an address type together with its backing variable of the same name.
    pub fn address(&mut self, name: impl Into<String>, width: u32) -> AddressId {
        let name = name.into();
        let var = self.variable(name.clone(), width);
        self.addresses.push(Address { name, var });
        AddressId(self.addresses.len() - 1)
    }

    /// Variable backing a declared address.
    pub fn address_var(&self, address: AddressId) -> Option<VarId> {
        self.addresses.get(address.0).map(|a| a.var)
    }

    /// Declares a buffer.
    pub fn buffer(&mut self, buffer: Buffer) -> BufferId {
        self.buffers.push(buffer);
        BufferId(self.buffers.len() - 1)
    }

    /// Declares an action.
    pub fn action(&mut self, name: impl Into<String>, assignments: Vec<Assignment>) -> ActionId {
        self.actions.push(Action {
            name: name.into(),
            assignments,
        });
        ActionId(self.actions.len() - 1)
    }

    /// Declares a transition.
    pub fn transition(&mut self, transition: Transition) -> TransitionId {
        self.transitions.push(transition);
        TransitionId(self.transitions.len() - 1)
    }

    /// Sets the entry action.
    pub const fn start(&mut self, action: ActionId) {
        self.start = Some(action);
    }

    /// Designates the virtual address type.
    pub const fn virtual_address(&mut self, address: AddressId) {
        self.virtual_address = Some(address);
    }

    /// Designates the physical address type.
    pub const fn physical_address(&mut self, address: AddressId) {
        self.physical_address = Some(address);
    }

    /// Validates the graph and freezes it.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate names, invalid widths, dangling ids, fields out of
    /// range, width mismatches, buffer expressions over a foreign variable, bad buffer
    /// geometry or a missing start action.
    pub fn build(self) -> Result<Subsystem> {
        self.check_names()?;
        for v in &self.variables {
            if v.width == 0 || v.width > 64 {
                return Err(Error::InvalidWidth {
                    name: v.name.clone(),
                    width: v.width,
                });
            }
        }
        for a in &self.addresses {
            let _ = self.check_var(a.var)?;
        }
        for (i, b) in self.buffers.iter().enumerate() {
            self.check_buffer(i, b)?;
        }
        for action in &self.actions {
            for assignment in &action.assignments {
                self.check_assignment(&action.name, assignment)?;
            }
        }
        for (i, t) in self.transitions.iter().enumerate() {
            self.check_transition(i, t)?;
        }
        for id in [self.virtual_address, self.physical_address].into_iter().flatten() {
            if id.0 >= self.addresses.len() {
                return Err(Error::DanglingReference(format!("address #{}", id.0)));
            }
        }
        let start = self
            .start
            .ok_or_else(|| Error::MalformedModel("no start action".to_string()))?;
        self.check_action(start)?;

        let mut outgoing = vec![Vec::new(); self.actions.len()];
        for (i, t) in self.transitions.iter().enumerate() {
            outgoing[t.source.0].push(TransitionId(i));
        }

        Ok(Subsystem {
            variables: self.variables,
            addresses: self.addresses,
            buffers: self.buffers,
            actions: self.actions,
            transitions: self.transitions,
            start,
            virtual_address: self.virtual_address,
            physical_address: self.physical_address,
            outgoing,
        })
    }

    fn check_names(&self) -> Result<()> {
        fn unique<'a>(kind: &'static str, names: impl Iterator<Item = &'a str>) -> Result<()> {
            let mut seen = BTreeSet::new();
            for name in names {
                if !seen.insert(name) {
                    return Err(Error::DuplicateName {
                        kind,
                        name: name.to_string(),
                    });
                }
            }
            Ok(())
        }
        unique("variable", self.variables.iter().map(|v| v.name.as_str()))?;
        unique("address", self.addresses.iter().map(|a| a.name.as_str()))?;
        unique("buffer", self.buffers.iter().map(|b| b.name.as_str()))?;
        unique("action", self.actions.iter().map(|a| a.name.as_str()))
    }

    fn check_var(&self, var: VarId) -> Result<&Variable> {
        self.variables
            .get(var.0)
            .ok_or_else(|| Error::DanglingReference(format!("variable #{}", var.0)))
    }

    fn check_action(&self, action: ActionId) -> Result<()> {
        if action.0 < self.actions.len() {
            Ok(())
        } else {
            Err(Error::DanglingReference(format!("action #{}", action.0)))
        }
    }

    fn check_field(&self, field: &Field) -> Result<()> {
        let v = self.check_var(field.var)?;
        if field.lo > field.hi || field.hi >= v.width {
            return Err(Error::FieldOutOfRange {
                var: v.name.clone(),
                lo: field.lo,
                hi: field.hi,
                width: v.width,
            });
        }
        Ok(())
    }

    fn check_expr(&self, expr: &Expression) -> Result<()> {
        expr.fields().iter().try_for_each(|f| self.check_field(f))
    }

    fn check_buffer(&self, id: usize, b: &Buffer) -> Result<()> {
        let address = self
            .addresses
            .get(b.address.0)
            .ok_or_else(|| Error::DanglingReference(format!("address of buffer `{}`", b.name)))?;
        if b.ways == 0 || b.sets == 0 {
            return Err(Error::MalformedModel(format!(
                "buffer `{}` has {} ways and {} sets",
                b.name, b.ways, b.sets
            )));
        }
        for expr in [&b.tag, &b.index, &b.offset] {
            self.check_expr(expr)?;
            if !expr.is_over(address.var) || expr.width() > 64 {
                return Err(Error::MalformedModel(format!(
                    "tag, index and offset of buffer `{}` must select bits of `{}`",
                    b.name, address.name
                )));
            }
        }
        for &f in &b.fields {
            let _ = self.check_var(f)?;
        }
        if let Some(parent) = b.parent {
            let p = self
                .buffers
                .get(parent.0)
                .ok_or_else(|| Error::DanglingReference(format!("parent of buffer `{}`", b.name)))?;
            if parent.0 == id || p.address != b.address || p.parent.is_some() {
                return Err(Error::MalformedModel(format!(
                    "buffer `{}` must view a top-level buffer keyed by the same address",
                    b.name
                )));
            }
        }
        Ok(())
    }

    fn check_assignment(&self, action: &str, assignment: &Assignment) -> Result<()> {
        self.check_field(&assignment.lhs)?;
        let width = assignment.lhs.width();
        match &assignment.rhs {
            Rhs::Expr(expr) => {
                self.check_expr(expr)?;
                if expr.width() > width {
                    return Err(Error::WidthMismatch {
                        context: format!("assignment in action `{action}`"),
                        left: width,
                        right: expr.width(),
                    });
                }
            }
            Rhs::Const(value) => {
                if *value & !bits::mask(width) != 0 {
                    return Err(Error::WidthMismatch {
                        context: format!("constant {value:#x} assigned in action `{action}`"),
                        left: width,
                        right: 64 - value.leading_zeros(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_transition(&self, id: usize, t: &Transition) -> Result<()> {
        self.check_action(t.source)?;
        self.check_action(t.target)?;
        if let Some((buffer, _)) = t.guard.buffer {
            if buffer.0 >= self.buffers.len() {
                return Err(Error::DanglingReference(format!("buffer of transition #{id}")));
            }
        }
        if let Some(condition) = &t.guard.condition {
            for atom in &condition.atoms {
                self.check_expr(&atom.expr)?;
                let width = atom.expr.width();
                if width > 64 || atom.value & !bits::mask(width) != 0 {
                    return Err(Error::WidthMismatch {
                        context: format!("condition of transition #{id}"),
                        left: width,
                        right: 64 - atom.value.leading_zeros(),
                    });
                }
            }
        }
        if let Some(call) = &t.call {
            self.check_action(call.procedure)?;
            let formal = self
                .addresses
                .get(call.formal.0)
                .ok_or_else(|| Error::DanglingReference(format!("formal of transition #{id}")))?;
            self.check_expr(&call.actual)?;
            let formal_width = self.check_var(formal.var)?.width;
            if call.actual.width() > formal_width {
                return Err(Error::WidthMismatch {
                    context: format!("call on transition #{id}"),
                    left: formal_width,
                    right: call.actual.width(),
                });
            }
            if let Some(result) = &call.result {
                self.check_field(&result.caller)?;
                self.check_field(&result.callee)?;
                if result.caller.width() != result.callee.width() {
                    return Err(Error::WidthMismatch {
                        context: format!("result binding on transition #{id}"),
                        left: result.caller.width(),
                        right: result.callee.width(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<SubsystemBuilder> for Subsystem {
    type Error = Error;

    fn try_from(builder: SubsystemBuilder) -> Result<Self> {
        builder.build()
    }
}

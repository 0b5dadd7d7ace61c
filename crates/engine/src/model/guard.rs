//! Transition guards.

use serde::{Deserialize, Serialize};

use super::buffer::{BufferEvent, BufferId};
use super::expr::Expression;
use crate::common::Operation;

/// How the atoms of a condition combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionKind {
    /// All atoms hold.
    #[default]
    And,
    /// At least one atom holds.
    Or,
}

/// `expr == value` or `expr != value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    /// Compared bits.
    pub expr: Expression,
    /// `true` for equality, `false` for disequality.
    #[serde(default = "Atom::default_equal")]
    pub equal: bool,
    /// Constant the bits are compared with.
    pub value: u64,
}

impl Atom {
    const fn default_equal() -> bool {
        true
    }

    /// `expr == value`.
    pub const fn equals(expr: Expression, value: u64) -> Self {
        Self {
            expr,
            equal: true,
            value,
        }
    }

    /// `expr != value`.
    pub const fn differs(expr: Expression, value: u64) -> Self {
        Self {
            expr,
            equal: false,
            value,
        }
    }
}

/// Combination of atoms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Condition {
    /// Conjunction or disjunction.
    #[serde(default)]
    pub kind: ConditionKind,
    /// Atomic comparisons.
    pub atoms: Vec<Atom>,
}

impl Condition {
    /// Conjunction of `atoms`.
    pub const fn all(atoms: Vec<Atom>) -> Self {
        Self {
            kind: ConditionKind::And,
            atoms,
        }
    }

    /// Disjunction of `atoms`.
    pub const fn any(atoms: Vec<Atom>) -> Self {
        Self {
            kind: ConditionKind::Or,
            atoms,
        }
    }
}

/// Enabling condition of a transition.
///
/// Every present part must hold for the transition to be taken.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Guard {
    /// Operation filter: the transition is only taken by this kind of access.
    #[serde(default)]
    pub operation: Option<Operation>,
    /// Buffer lookup outcome the transition stands for.
    #[serde(default)]
    pub buffer: Option<(BufferId, BufferEvent)>,
    /// Bit-field condition.
    #[serde(default)]
    pub condition: Option<Condition>,
    /// Memory region the transition is restricted to.
    #[serde(default)]
    pub region: Option<String>,
}

impl Guard {
    /// A guard that always holds.
    pub const fn always() -> Self {
        Self {
            operation: None,
            buffer: None,
            condition: None,
            region: None,
        }
    }

    /// A guard selecting a buffer lookup outcome.
    pub fn event(buffer: BufferId, event: BufferEvent) -> Self {
        Self {
            buffer: Some((buffer, event)),
            ..Self::always()
        }
    }

    /// A guard filtering on the operation.
    pub fn operation(operation: Operation) -> Self {
        Self {
            operation: Some(operation),
            ..Self::always()
        }
    }

    /// Adds a bit-field condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Adds a region restriction.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Returns whether an access performing `operation` may take the transition.
    pub fn admits(&self, operation: Operation) -> bool {
        self.operation.is_none_or(|op| op == operation)
    }
}

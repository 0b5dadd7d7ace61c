//! Hazards between two lookups of the same buffer.

use std::fmt;

use serde::Serialize;

use super::path::BufferAccess;
use crate::model::{Buffer, BufferId, Expression, Subsystem};
use crate::symbolic::formula::Clause;

/// Relation between the primary (earlier) and the secondary (later) lookup of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HazardType {
    /// Same set and same tag.
    TagEqual,
    /// Same set, different tags.
    TagNotEqual,
    /// Same set; the secondary tag is the one evicted by the primary miss.
    TagReplaced,
    /// Same set; the primary miss does not evict the secondary tag.
    TagNotReplaced,
    /// Same set (tagless buffers).
    IndexEqual,
    /// Different sets.
    IndexNotEqual,
}

impl HazardType {
    /// Every hazard type.
    pub const ALL: [Self; 6] = [
        Self::TagEqual,
        Self::TagNotEqual,
        Self::TagReplaced,
        Self::TagNotReplaced,
        Self::IndexEqual,
        Self::IndexNotEqual,
    ];

    /// Returns whether the hazard implies equal indices.
    pub const fn is_index_equal(self) -> bool {
        !matches!(self, Self::IndexNotEqual)
    }
}

impl fmt::Display for HazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TagEqual => "TAG_EQUAL",
            Self::TagNotEqual => "TAG_NOT_EQUAL",
            Self::TagReplaced => "TAG_REPLACED",
            Self::TagNotReplaced => "TAG_NOT_REPLACED",
            Self::IndexEqual => "INDEX_EQUAL",
            Self::IndexNotEqual => "INDEX_NOT_EQUAL",
        };
        write!(f, "{name}")
    }
}

/// Bit-field condition implied by a hazard: `Some(true)` = equal, `Some(false)` = different.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HazardCondition {
    /// Relation of the index bits, if constrained.
    pub index: Option<bool>,
    /// Relation of the tag bits, if constrained.
    pub tag: Option<bool>,
}

impl HazardCondition {
    fn of(ty: HazardType, buffer: &Buffer) -> Self {
        let indexed = buffer.sets > 1 && !buffer.index.is_empty();
        let same_set = if indexed { Some(true) } else { None };
        match ty {
            HazardType::TagEqual => Self {
                index: same_set,
                tag: Some(true),
            },
            HazardType::TagNotEqual | HazardType::TagReplaced | HazardType::TagNotReplaced => Self {
                index: same_set,
                tag: Some(false),
            },
            HazardType::IndexEqual => Self {
                index: same_set,
                tag: None,
            },
            HazardType::IndexNotEqual => Self {
                index: Some(false),
                tag: None,
            },
        }
    }
}

/// A typed relation between two lookups of the same buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Hazard {
    /// Relation type.
    pub ty: HazardType,
    /// Lookup in the earlier access.
    pub primary: BufferAccess,
    /// Lookup in the later access.
    pub secondary: BufferAccess,
    /// Implied bit-field condition.
    pub condition: HazardCondition,
}

impl Hazard {
    /// Creates a hazard; both lookups must be of the same buffer.
    pub fn new(
        subsystem: &Subsystem,
        ty: HazardType,
        primary: BufferAccess,
        secondary: BufferAccess,
    ) -> Self {
        assert_eq!(primary.buffer, secondary.buffer, "hazard across different buffers");
        Self {
            ty,
            primary,
            secondary,
            condition: HazardCondition::of(ty, subsystem.buffer(primary.buffer)),
        }
    }

    /// The buffer both lookups refer to.
    pub const fn buffer(&self) -> BufferId {
        self.primary.buffer
    }

    /// Condition between the primary lookup in `primary_slot` and the secondary lookup in
    /// `secondary_slot`.
    pub fn condition_clause(&self, subsystem: &Subsystem, primary_slot: u32, secondary_slot: u32) -> Clause {
        let buffer = subsystem.buffer(self.buffer());
        let left = (primary_slot, self.primary.frame());
        let right = (secondary_slot, self.secondary.frame());
        let part = |expr: &Expression, relation: Option<bool>| match relation {
            None => None,
            Some(true) => Some(Clause::exprs_equal(expr, left, right)),
            Some(false) => Some(Clause::exprs_differ(expr, left, right)),
        };
        let c = self.condition;
        Clause::And(
            [part(&buffer.index, c.index), part(&buffer.tag, c.tag)]
                .into_iter()
                .flatten()
                .collect(),
        )
    }

    /// Condition of the secondary lookup in `slot` against the solved address of the
    /// primary lookup.
    pub fn condition_against(&self, subsystem: &Subsystem, slot: u32, primary_address: u64) -> Clause {
        let buffer = subsystem.buffer(self.buffer());
        let frame = self.secondary.frame();
        let part = |expr: &Expression, value: u64, relation: Option<bool>| match relation {
            None => None,
            Some(true) => Some(Clause::expr_equals(expr, slot, frame, value)),
            Some(false) => Some(Clause::expr_differs(expr, slot, frame, value)),
        };
        let c = self.condition;
        Clause::And(
            [
                part(&buffer.index, buffer.index_of(primary_address), c.index),
                part(&buffer.tag, buffer.tag_of(primary_address), c.tag),
            ]
            .into_iter()
            .flatten()
            .collect(),
        )
    }
}

impl fmt::Display for Hazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(#{})", self.ty, self.buffer().0)
    }
}

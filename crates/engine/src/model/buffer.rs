//! Buffers: caches, TLBs and other keyed storage of the memory subsystem.
//!
//! A buffer is addressed by one of the subsystem's addresses. Its tag, index and offset
//! expressions select bits of that address; a `ways`-way, `sets`-set buffer holds at most
//! `ways` tags per index. A buffer with a `parent` is a view: its entries are a cached
//! subset of the parent's (e.g. a micro-TLB over a joint TLB).

use serde::{Deserialize, Serialize};

use super::expr::{Expression, VarId};
use super::subsystem::AddressId;

/// Index of a buffer in its subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BufferId(pub usize);

/// Outcome of a buffer lookup along a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BufferEvent {
    /// The looked-up tag is present.
    Hit,
    /// The looked-up tag is absent.
    Miss,
    /// The buffer is read without a hit/miss distinction (parents of views, page tables).
    Read,
}

impl BufferEvent {
    /// The event used for constraint resolution: a plain read behaves as a hit.
    pub const fn resolved(self) -> Self {
        match self {
            Self::Read => Self::Hit,
            other => other,
        }
    }
}

/// Replacement policy of a replaceable buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReplacementPolicy {
    /// Least recently used.
    #[default]
    #[serde(alias = "LRU")]
    Lru,
    /// First in, first out.
    #[serde(alias = "FIFO")]
    Fifo,
    /// Tree pseudo-LRU.
    #[serde(alias = "PLRU")]
    Plru,
    /// Most recently used.
    #[serde(alias = "MRU")]
    Mru,
    /// Seeded pseudo-random.
    #[serde(alias = "RANDOM")]
    Random,
}

impl ReplacementPolicy {
    /// Number of misses on fresh tags after which a set of `ways` ways holds only those
    /// tags, in a replacement order that does not depend on what it held before.
    ///
    /// `None` when no miss sequence reaches such a state: pseudo-LRU bits, the MRU victim
    /// and random victims keep an unknown line resident or the order undetermined.
    pub const fn flush_length(self, ways: usize) -> Option<usize> {
        match self {
            Self::Lru | Self::Fifo => Some(ways),
            Self::Plru | Self::Mru | Self::Random => None,
        }
    }

    /// Number of tags primed into one set that stay resident while only they are accessed.
    ///
    /// `flushed` tells whether the set was flushed before the first of them was loaded.
    pub fn hit_capacity(self, ways: usize, flushed: bool) -> usize {
        let capacity = match self {
            Self::Lru => ways,
            Self::Fifo if flushed => ways,
            Self::Plru => 2,
            Self::Fifo | Self::Mru | Self::Random => 1,
        };
        capacity.min(ways)
    }

    /// Returns whether a replay from an empty set predicts hits, misses and victims of a
    /// set in that state.
    pub const fn replays_exactly(self, flushed: bool) -> bool {
        matches!(self, Self::Lru) || (matches!(self, Self::Fifo) && flushed)
    }
}

/// A cache, TLB or table of the memory subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buffer {
    /// Unique buffer name.
    pub name: String,
    /// Address type the buffer is keyed by.
    pub address: AddressId,
    /// Associativity.
    pub ways: usize,
    /// Number of sets.
    pub sets: usize,
    /// Tag bits of the address.
    #[serde(default)]
    pub tag: Expression,
    /// Index bits of the address.
    #[serde(default)]
    pub index: Expression,
    /// Offset bits of the address.
    #[serde(default)]
    pub offset: Expression,
    /// Entry field variables (e.g. the PFN of a TLB entry).
    #[serde(default)]
    pub fields: Vec<VarId>,
    /// Whether the hardware evicts entries by itself.
    #[serde(default)]
    pub replaceable: bool,
    /// Replacement policy used when `replaceable`.
    #[serde(default)]
    pub policy: ReplacementPolicy,
    /// Parent buffer of a view.
    #[serde(default)]
    pub parent: Option<BufferId>,
}

impl Buffer {
    /// Returns whether the buffer is a view of a parent buffer.
    pub const fn is_view(&self) -> bool {
        self.parent.is_some()
    }

    /// Returns whether lookups compare tags (tagless buffers are indexed only).
    pub fn has_tag(&self) -> bool {
        !self.tag.is_empty()
    }

    /// Tag of `address`.
    pub fn tag_of(&self, address: u64) -> u64 {
        self.tag.evaluate(|_| address)
    }

    /// Index of `address`.
    pub fn index_of(&self, address: u64) -> u64 {
        self.index.evaluate(|_| address)
    }

    /// Offset of `address`.
    pub fn offset_of(&self, address: u64) -> u64 {
        self.offset.evaluate(|_| address)
    }

    /// Set number of `address` within `0..sets`.
    pub fn set_of(&self, address: u64) -> usize {
        (self.index_of(address) % self.sets.max(1) as u64) as usize
    }

    /// Assembles an address from its tag, index and offset.
    ///
    /// # Arguments
    ///
    /// * `tag` - Tag bits.
    /// * `index` - Index bits.
    /// * `offset` - Offset bits.
    pub fn address_of(&self, tag: u64, index: u64, offset: u64) -> u64 {
        let address = self.offset.deposit(0, offset);
        let address = self.index.deposit(address, index);
        self.tag.deposit(address, tag)
    }

    /// Replaces the tag bits of `address`, keeping index and offset.
    pub fn with_tag(&self, address: u64, tag: u64) -> u64 {
        self.tag.deposit(address, tag)
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        self.ways * self.sets
    }
}

//! Buffer state tracking.
//!
//! Replays a sequence of addresses through a model of one replaceable buffer to find out
//! which tag a given access evicts. Empty ways are filled before any valid tag is evicted.

use super::policies::{self, ReplacementState};
use crate::model::Buffer;

/// Tags held by a buffer under its replacement policy.
#[derive(Debug)]
pub struct BufferStateTracker<'a> {
    buffer: &'a Buffer,
    lines: Vec<Vec<Option<u64>>>,
    policy: Box<dyn ReplacementState>,
}

impl<'a> BufferStateTracker<'a> {
    /// Creates an empty tracker for `buffer`.
    pub fn new(buffer: &'a Buffer) -> Self {
        let sets = buffer.sets.max(1);
        let ways = buffer.ways.max(1);
        Self {
            buffer,
            lines: vec![vec![None; ways]; sets],
            policy: policies::for_policy(buffer.policy, sets, ways),
        }
    }

    /// Accesses `address`.
    ///
    /// # Returns
    ///
    /// The tag evicted to make room for `address`, or `None` on a hit or a fill of an
    /// empty way.
    pub fn track(&mut self, address: u64) -> Option<u64> {
        let set = self.buffer.set_of(address);
        let tag = self.buffer.tag_of(address);
        let lines = &mut self.lines[set];
        if let Some(way) = lines.iter().position(|l| *l == Some(tag)) {
            self.policy.hit(set, way);
            return None;
        }
        if let Some(way) = lines.iter().position(Option::is_none) {
            lines[way] = Some(tag);
            self.policy.update(set, way);
            return None;
        }
        let way = self.policy.victim(set).min(lines.len() - 1);
        let evicted = lines[way].replace(tag);
        self.policy.update(set, way);
        evicted
    }

    /// Returns whether the tag of `address` is held.
    pub fn contains(&self, address: u64) -> bool {
        let tag = self.buffer.tag_of(address);
        self.lines[self.buffer.set_of(address)].contains(&Some(tag))
    }
}

//! Buffer State Tracker Unit Tests.
//!
//! Four tags fill set 0 of the 4-way cache, one of them is hit, and a fifth tag then
//! evicts the way chosen by the replacement policy. Flushes with fresh tags empty the set
//! of every older tag only under the policies that declare a flush length.

use mmutest_core::model::ReplacementPolicy;
use mmutest_core::solver::BufferStateTracker;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::builder::{L1, cache_subsystem};

const A: u64 = 0x1;
const B: u64 = 0x2;
const C: u64 = 0x3;
const D: u64 = 0x4;
const E: u64 = 0x5;

/// Address of `tag` in set 0.
const fn at(tag: u64) -> u64 {
    tag << 4
}

// ══════════════════════════════════════════════════════════
// 1. Victim selection
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(ReplacementPolicy::Lru, A, B)]
#[case(ReplacementPolicy::Lru, B, A)]
#[case(ReplacementPolicy::Fifo, A, A)]
#[case(ReplacementPolicy::Fifo, B, A)]
#[case(ReplacementPolicy::Mru, A, A)]
#[case(ReplacementPolicy::Mru, B, B)]
#[case(ReplacementPolicy::Plru, A, B)]
#[case(ReplacementPolicy::Plru, B, A)]
fn policy_selects_victim(#[case] policy: ReplacementPolicy, #[case] hit: u64, #[case] evicted: u64) {
    let s = cache_subsystem(policy);
    let mut tracker = BufferStateTracker::new(s.buffer(L1));
    for tag in [A, B, C, D] {
        assert_eq!(tracker.track(at(tag)), None);
    }
    assert_eq!(tracker.track(at(hit)), None);
    assert_eq!(tracker.track(at(E)), Some(evicted));
    assert!(tracker.contains(at(E)));
    assert!(!tracker.contains(at(evicted)));
}

#[test]
fn random_policy_evicts_a_held_tag() {
    let s = cache_subsystem(ReplacementPolicy::Random);
    let mut tracker = BufferStateTracker::new(s.buffer(L1));
    for tag in [A, B, C, D] {
        let _ = tracker.track(at(tag));
    }
    let evicted = tracker.track(at(E)).unwrap();
    assert!([A, B, C, D].contains(&evicted));
    assert!(!tracker.contains(at(evicted)));
}

// ══════════════════════════════════════════════════════════
// 2. Set isolation
// ══════════════════════════════════════════════════════════

#[test]
fn sets_are_tracked_independently() {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let mut tracker = BufferStateTracker::new(s.buffer(L1));
    for tag in [A, B, C, D] {
        let _ = tracker.track(at(tag));
    }
    // Same tags in set 1 fill empty ways.
    for tag in [A, B, C, D] {
        assert_eq!(tracker.track(at(tag) | 0x4), None);
    }
    assert!(tracker.contains(at(A)));
    assert!(tracker.contains(at(A) | 0x4));
    assert!(!tracker.contains(at(E)));
}

#[test]
fn offset_bits_do_not_matter() {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let mut tracker = BufferStateTracker::new(s.buffer(L1));
    let _ = tracker.track(at(A));
    assert!(tracker.contains(at(A) | 0x3));
    assert_eq!(tracker.track(at(A) | 0x2), None);
}

// ══════════════════════════════════════════════════════════
// 3. Flushes
// ══════════════════════════════════════════════════════════

const FRESH: [u64; 4] = [0x6, 0x7, 0x8, 0x9];

#[rstest]
#[case(ReplacementPolicy::Lru, A)]
#[case(ReplacementPolicy::Lru, D)]
#[case(ReplacementPolicy::Fifo, A)]
#[case(ReplacementPolicy::Fifo, D)]
fn flush_leaves_only_fresh_tags(#[case] policy: ReplacementPolicy, #[case] hit: u64) {
    let s = cache_subsystem(policy);
    let l1 = s.buffer(L1);
    let mut tracker = BufferStateTracker::new(l1);
    for tag in [A, B, C, D, hit] {
        let _ = tracker.track(at(tag));
    }
    let length = policy.flush_length(l1.ways).unwrap();
    assert_eq!(length, FRESH.len());
    for &tag in &FRESH[..length] {
        let _ = tracker.track(at(tag));
    }
    for tag in [A, B, C, D] {
        assert!(!tracker.contains(at(tag)), "{policy:?} kept {tag:#x}");
    }
    assert!(FRESH.iter().all(|&tag| tracker.contains(at(tag))));
}

#[rstest]
#[case(ReplacementPolicy::Plru)]
#[case(ReplacementPolicy::Mru)]
#[case(ReplacementPolicy::Random)]
fn policy_without_flush_length(#[case] policy: ReplacementPolicy) {
    assert_eq!(policy.flush_length(4), None);
    assert!(!policy.replays_exactly(true));
}

#[test]
fn mru_keeps_old_tags_through_fresh_misses() {
    let s = cache_subsystem(ReplacementPolicy::Mru);
    let mut tracker = BufferStateTracker::new(s.buffer(L1));
    for tag in [A, B, C, D].into_iter().chain(FRESH) {
        let _ = tracker.track(at(tag));
    }
    for tag in [A, B, C] {
        assert!(tracker.contains(at(tag)));
    }
}

#[rstest]
#[case(ReplacementPolicy::Lru, false, 4)]
#[case(ReplacementPolicy::Fifo, false, 1)]
#[case(ReplacementPolicy::Fifo, true, 4)]
#[case(ReplacementPolicy::Plru, true, 2)]
#[case(ReplacementPolicy::Mru, true, 1)]
#[case(ReplacementPolicy::Random, false, 1)]
fn primed_tags_per_set(#[case] policy: ReplacementPolicy, #[case] flushed: bool, #[case] capacity: usize) {
    assert_eq!(policy.hit_capacity(4, flushed), capacity);
    assert_eq!(policy.hit_capacity(1, flushed), 1);
}

//! Coverage Unit Tests.
//!
//! Verifies path extraction (operation filters, event allow-lists, integer constraints),
//! the classifiers and the structurally possible hazards between two lookups.

use mmutest_core::access::HazardType;
use mmutest_core::common::{AccessType, DataType, Operation};
use mmutest_core::config::{Classifier, EngineConfig, IntegerConstraint, MemoryAccessConstraints};
use mmutest_core::coverage::{PathExtractor, classify, possible_types};
use mmutest_core::model::{BufferEvent, ReplacementPolicy};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::builder::{L1, TLB, cache_subsystem, load_only_subsystem, tlb_subsystem};
use crate::common::harness::{LOAD, lookup, path_with, paths};

// ══════════════════════════════════════════════════════════
// 1. Extraction
// ══════════════════════════════════════════════════════════

#[test]
fn cache_has_a_hit_and_a_miss_path() {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let extracted = paths(&s, LOAD);
    assert_eq!(extracted.len(), 2);
    let events: Vec<_> = extracted.iter().map(|p| p.event(L1)).collect();
    assert_eq!(events, vec![Some(BufferEvent::Hit), Some(BufferEvent::Miss)]);
    for p in &extracted {
        assert_eq!(p.buffer_reads().len(), 1);
        assert_eq!(p.address_instances().len(), 1);
    }
}

#[test]
fn load_only_graph_yields_no_store_path() {
    let s = load_only_subsystem();
    assert_eq!(paths(&s, AccessType::load(DataType::Word)).len(), 1);
    for width in [DataType::Byte, DataType::Hword, DataType::Word, DataType::Dword] {
        assert!(paths(&s, AccessType::store(width)).is_empty());
    }
}

#[test]
fn event_allow_list_prunes_paths() {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let config = EngineConfig::default();
    let only_miss = MemoryAccessConstraints::default().with_events("L1", [BufferEvent::Miss]);
    let extracted = PathExtractor::new(&s, config.max_path_depth, config.max_paths)
        .extract(LOAD, &only_miss)
        .unwrap();
    assert_eq!(extracted.len(), 1);
    assert_eq!(extracted[0].event(L1), Some(BufferEvent::Miss));
}

#[test]
fn unsatisfiable_integer_constraint_drops_every_path() {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let config = EngineConfig::default();
    let empty = MemoryAccessConstraints::default().with_integer(IntegerConstraint::retain("VA", Vec::new()));
    let extracted = PathExtractor::new(&s, config.max_path_depth, config.max_paths)
        .extract(LOAD, &empty)
        .unwrap();
    assert!(extracted.is_empty());
}

#[test]
fn unknown_constraint_name_is_an_error() {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let config = EngineConfig::default();
    let bad = MemoryAccessConstraints::default().with_events("L9", [BufferEvent::Hit]);
    assert!(
        PathExtractor::new(&s, config.max_path_depth, config.max_paths)
            .extract(LOAD, &bad)
            .is_err()
    );
}

#[test]
fn max_paths_bounds_extraction() {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let extracted = PathExtractor::new(&s, 8, 1)
        .extract(LOAD, &MemoryAccessConstraints::default())
        .unwrap();
    assert_eq!(extracted.len(), 1);
}

// ══════════════════════════════════════════════════════════
// 2. Classification
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(Classifier::Trivial, 2)]
#[case(Classifier::BufferEvents, 2)]
#[case(Classifier::Buffers, 1)]
fn classifiers_partition_cache_paths(#[case] classifier: Classifier, #[case] classes: usize) {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let extracted = paths(&s, LOAD);
    let partition = classify(classifier, &extracted);
    assert_eq!(partition.len(), classes);
    assert_eq!(partition.iter().map(Vec::len).sum::<usize>(), extracted.len());
}

// ══════════════════════════════════════════════════════════
// 3. Possible hazards
// ══════════════════════════════════════════════════════════

#[test]
fn replaceable_miss_adds_replacement_hazards() {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let hit = lookup(&path_with(&s, L1, BufferEvent::Hit), L1);
    let miss = lookup(&path_with(&s, L1, BufferEvent::Miss), L1);
    assert_eq!(
        possible_types(&s, &hit, &miss),
        vec![HazardType::IndexNotEqual, HazardType::TagNotEqual, HazardType::TagEqual]
    );
    assert_eq!(
        possible_types(&s, &miss, &hit),
        vec![
            HazardType::IndexNotEqual,
            HazardType::TagNotEqual,
            HazardType::TagEqual,
            HazardType::TagReplaced,
            HazardType::TagNotReplaced
        ]
    );
}

#[test]
fn non_replaceable_miss_replaces_nothing() {
    let s = tlb_subsystem();
    let miss = lookup(&path_with(&s, TLB, BufferEvent::Miss), TLB);
    assert_eq!(
        possible_types(&s, &miss, &miss),
        vec![HazardType::IndexNotEqual, HazardType::TagNotEqual, HazardType::TagEqual]
    );
}

#[test]
fn store_and_load_differ_only_in_operation() {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let store = paths(&s, AccessType::new(Operation::Store, DataType::Byte));
    assert_eq!(store.len(), 2);
}

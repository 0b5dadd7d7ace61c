//! Structure Solver Unit Tests.
//!
//! Verifies the address pass (hazard conditions, regions, alignment), hit priming, miss
//! evictions, replaced-tag binding, entry sharing of non-replaceable buffers, entries of
//! views and the replacement-policy rules. Outcomes are checked by replaying the loads and
//! then the accesses through a fresh state tracker.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use mmutest_core::access::{Access, Dependency, Hazard, HazardType, Structure};
use mmutest_core::common::DataType;
use mmutest_core::config::{RegionKind, RegionSettings};
use mmutest_core::model::{BufferEvent, BufferId, ReplacementPolicy, Subsystem};
use mmutest_core::solver::{BufferStateTracker, Solution, SolverResult};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use crate::common::builder::{
    JTLB, L1, L2, TLB, UTLB, cache_subsystem, lru_cache, pfn, tlb_subsystem, two_level_cache, view_subsystem,
};
use crate::common::harness::{LOAD, SolverContext, access, access_at, lookup, paths, related};

/// Address of the lookup of `buffer` in access `i`.
fn address(solution: &Solution, i: usize, buffer: BufferId) -> u64 {
    let l = lookup(solution.structure().access(i).path(), buffer);
    solution.address_object(i).address(&l.address).unwrap()
}

fn sat(result: SolverResult) -> Solution {
    match result {
        SolverResult::Sat(solution) => solution,
        SolverResult::Unsat { reason } => panic!("unexpected unsat: {reason}"),
    }
}

/// Replays the loads and then the lookups of `buffer` in access order, checking that each
/// lookup hits or misses as its path says.
///
/// # Returns
///
/// The tag each access evicts from `buffer`.
fn replay(subsystem: &Subsystem, solution: &Solution, buffer: BufferId) -> Vec<Option<u64>> {
    let b = subsystem.buffer(buffer);
    let mut tracker = BufferStateTracker::new(b);
    for load in solution.loader().loads_of(b.address) {
        let _ = tracker.track(load.address);
    }
    (0..solution.structure().len())
        .map(|i| {
            let l = lookup(solution.structure().access(i).path(), buffer);
            let a = address(solution, i, buffer);
            let hit = l.event.resolved() == BufferEvent::Hit;
            assert_eq!(tracker.contains(a), hit, "access {i} at {a:#x} expects {:?}", l.event);
            tracker.track(a)
        })
        .collect()
}

/// Accesses related by `hazards`, each `(i, j, ty)` on `buffer`.
fn with_hazards(
    subsystem: &Subsystem,
    accesses: Vec<Access>,
    buffer: BufferId,
    hazards: &[(usize, usize, HazardType)],
) -> Structure {
    let mut dependencies = BTreeMap::new();
    for &(i, j, ty) in hazards {
        let hazard = Hazard::new(
            subsystem,
            ty,
            lookup(accesses[i].path(), buffer),
            lookup(accesses[j].path(), buffer),
        );
        let _ = dependencies.insert((i, j), Dependency::from_hazards(vec![hazard]));
    }
    Structure::new(accesses, dependencies).unwrap()
}

/// A byte load on the micro-TLB path seeing `event`; a miss goes on to hit the joint TLB.
fn view_access(subsystem: &Subsystem, event: BufferEvent) -> Access {
    let path = paths(subsystem, LOAD)
        .into_iter()
        .find(|p| p.event(UTLB) == Some(event) && p.event(JTLB) != Some(BufferEvent::Miss))
        .unwrap();
    Access::unconstrained(LOAD, path)
}

/// `n` accesses related pairwise by `ty` on `buffer`.
fn all_related(subsystem: &Subsystem, accesses: Vec<Access>, buffer: BufferId, ty: HazardType) -> Structure {
    let n = accesses.len();
    let mut dependencies = BTreeMap::new();
    for i in 0..n {
        for j in i + 1..n {
            let hazard = Hazard::new(
                subsystem,
                ty,
                lookup(accesses[i].path(), buffer),
                lookup(accesses[j].path(), buffer),
            );
            let _ = dependencies.insert((i, j), Dependency::from_hazards(vec![hazard]));
        }
    }
    Structure::new(accesses, dependencies).unwrap()
}

// ══════════════════════════════════════════════════════════
// 1. Hits
// ══════════════════════════════════════════════════════════

#[test]
fn tag_equal_hit_reuses_the_primed_line() {
    let mut ctx = SolverContext::new(lru_cache(), 1);
    let s = Arc::clone(&ctx.subsystem);
    let structure = related(
        &s,
        access_at(&s, L1, BufferEvent::Hit, 0x1F),
        access(&s, L1, BufferEvent::Hit),
        L1,
        HazardType::TagEqual,
    );
    let solution = sat(ctx.solve(&structure));
    assert_eq!(address(&solution, 0, L1), 0x1F);
    assert!((0x1C..=0x1F).contains(&address(&solution, 1, L1)));

    let loads = solution.loader().loads();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].event, BufferEvent::Hit);
    assert_eq!(loads[0].address, 0x1F);
}

#[test]
fn hit_priming_is_bounded_by_associativity() {
    let mut ctx = SolverContext::new(lru_cache(), 2);
    let s = Arc::clone(&ctx.subsystem);
    let four: Vec<Access> = (0..4).map(|_| access(&s, L1, BufferEvent::Hit)).collect();
    let solution = sat(ctx.solve(&all_related(&s, four, L1, HazardType::TagNotEqual)));
    assert_eq!(solution.loader().len(), 4);

    let five: Vec<Access> = (0..5).map(|_| access(&s, L1, BufferEvent::Hit)).collect();
    let result = ctx.solve(&all_related(&s, five, L1, HazardType::TagNotEqual));
    assert!(result.reason().unwrap().starts_with("Hit constraint violation"));
}

// ══════════════════════════════════════════════════════════
// 2. Misses
// ══════════════════════════════════════════════════════════

#[test]
fn miss_is_forced_by_evicting_the_whole_set() {
    let mut ctx = SolverContext::new(lru_cache(), 3);
    let s = Arc::clone(&ctx.subsystem);
    let structure = Structure::new(vec![access(&s, L1, BufferEvent::Miss)], BTreeMap::new()).unwrap();
    let solution = sat(ctx.solve(&structure));
    let l1 = s.buffer(L1);
    let own = address(&solution, 0, L1);

    let evicting: Vec<u64> = solution.loader().loads_for(L1).map(|l| l.address).collect();
    assert_eq!(evicting.len(), 4);
    assert!(solution.loader().loads().iter().all(|l| l.event == BufferEvent::Miss));
    let tags: BTreeSet<u64> = evicting.iter().map(|&a| l1.tag_of(a)).collect();
    assert_eq!(tags.len(), 4);
    assert!(!tags.contains(&l1.tag_of(own)));
    assert!(evicting.iter().all(|&a| l1.index_of(a) == l1.index_of(own)));
}

#[test]
fn miss_reprimes_the_hits_of_its_set() {
    let mut ctx = SolverContext::new(lru_cache(), 4);
    let s = Arc::clone(&ctx.subsystem);
    let structure = related(
        &s,
        access(&s, L1, BufferEvent::Hit),
        access(&s, L1, BufferEvent::Miss),
        L1,
        HazardType::TagNotEqual,
    );
    let solution = sat(ctx.solve(&structure));
    let loads = solution.loader().loads();
    assert_eq!(loads.len(), 6);
    let hit = address(&solution, 0, L1);
    assert_eq!((loads[0].event, loads[0].address), (BufferEvent::Hit, hit));
    assert_eq!((loads[5].event, loads[5].address), (BufferEvent::Hit, hit));
    assert!(loads[1..5].iter().all(|l| l.event == BufferEvent::Miss));
}

#[test]
fn miss_on_a_primed_tag_is_unsat() {
    let mut ctx = SolverContext::new(lru_cache(), 5);
    let s = Arc::clone(&ctx.subsystem);
    let structure = Structure::new(
        vec![
            access_at(&s, L1, BufferEvent::Hit, 0x1F),
            access_at(&s, L1, BufferEvent::Miss, 0x1F),
        ],
        BTreeMap::new(),
    )
    .unwrap();
    let result = ctx.solve(&structure);
    assert!(!result.is_sat());
    assert!(result.reason().unwrap().starts_with("Miss constraint violation"));
}

#[test]
fn tag_equal_miss_is_unsat() {
    let mut ctx = SolverContext::new(lru_cache(), 6);
    let s = Arc::clone(&ctx.subsystem);
    let structure = related(
        &s,
        access(&s, L1, BufferEvent::Hit),
        access(&s, L1, BufferEvent::Miss),
        L1,
        HazardType::TagEqual,
    );
    assert!(ctx.solve(&structure).solution().is_none());
}

#[test]
fn replaced_tag_is_the_one_the_primary_miss_evicts() {
    let mut ctx = SolverContext::new(lru_cache(), 7);
    let s = Arc::clone(&ctx.subsystem);
    let structure = related(
        &s,
        access(&s, L1, BufferEvent::Miss),
        access(&s, L1, BufferEvent::Miss),
        L1,
        HazardType::TagReplaced,
    );
    let solution = sat(ctx.solve(&structure));
    let l1 = s.buffer(L1);

    let mut tracker = BufferStateTracker::new(l1);
    for load in solution.loader().loads() {
        let _ = tracker.track(load.address);
    }
    let evicted = tracker.track(address(&solution, 0, L1));
    let replaced = address(&solution, 1, L1);
    assert_eq!(evicted, Some(l1.tag_of(replaced)));
    assert_eq!(l1.index_of(replaced), l1.index_of(address(&solution, 0, L1)));
}

#[test]
fn later_hit_that_reorders_the_set_unbinds_a_replaced_tag() {
    let s = lru_cache();
    let hazards = [
        (0, 1, HazardType::TagReplaced),
        (0, 2, HazardType::TagNotEqual),
        (1, 2, HazardType::TagNotEqual),
    ];
    let mut rejected = 0;
    for seed in 1..=32 {
        let mut ctx = SolverContext::new(Arc::clone(&s), seed);
        let accesses = vec![
            access(&s, L1, BufferEvent::Miss),
            access(&s, L1, BufferEvent::Miss),
            access(&s, L1, BufferEvent::Hit),
        ];
        match ctx.solve(&with_hazards(&s, accesses, L1, &hazards)) {
            SolverResult::Sat(solution) => {
                let evicted = replay(&s, &solution, L1);
                let bound = s.buffer(L1).tag_of(address(&solution, 1, L1));
                assert_eq!(evicted[0], Some(bound), "seed {seed}");
            }
            SolverResult::Unsat { reason } => {
                assert!(reason.starts_with("Replay constraint violation"), "seed {seed}: {reason}");
                rejected += 1;
            }
        }
    }
    // Priming the hit usually moves the eviction away from the bound tag.
    assert!(rejected > 0);
}

#[test]
fn l2_hit_reflushes_the_l1_set_it_loads_through() {
    let mut ctx = SolverContext::new(Arc::new(two_level_cache()), 15);
    let s = Arc::clone(&ctx.subsystem);
    let structure = Structure::new(vec![access(&s, L2, BufferEvent::Hit)], BTreeMap::new()).unwrap();
    let solution = sat(ctx.solve(&structure));
    let own = address(&solution, 0, L1);

    let loads = solution.loader().loads();
    assert_eq!(loads.len(), 5);
    assert_eq!((loads[2].buffer, loads[2].event, loads[2].address), (L2, BufferEvent::Hit, own));
    assert!(loads[..2].iter().chain(&loads[3..]).all(|l| l.buffer == L1 && l.event == BufferEvent::Miss));
    let _ = replay(&s, &solution, L1);
    let _ = replay(&s, &solution, L2);
}

// ══════════════════════════════════════════════════════════
// 3. Replacement policies
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(ReplacementPolicy::Lru)]
#[case(ReplacementPolicy::Fifo)]
fn flushable_policy_forces_misses(#[case] policy: ReplacementPolicy) {
    let mut ctx = SolverContext::new(Arc::new(cache_subsystem(policy)), 16);
    let s = Arc::clone(&ctx.subsystem);
    let miss = Structure::new(vec![access(&s, L1, BufferEvent::Miss)], BTreeMap::new()).unwrap();
    let solution = sat(ctx.solve(&miss));
    assert_eq!(solution.loader().len(), 4);
    let _ = replay(&s, &solution, L1);

    let replaced = related(
        &s,
        access(&s, L1, BufferEvent::Miss),
        access(&s, L1, BufferEvent::Miss),
        L1,
        HazardType::TagReplaced,
    );
    let solution = sat(ctx.solve(&replaced));
    let evicted = replay(&s, &solution, L1);
    assert_eq!(evicted[0], Some(s.buffer(L1).tag_of(address(&solution, 1, L1))));
}

#[rstest]
#[case(ReplacementPolicy::Plru)]
#[case(ReplacementPolicy::Mru)]
#[case(ReplacementPolicy::Random)]
fn unflushable_policy_rejects_misses(#[case] policy: ReplacementPolicy) {
    let mut ctx = SolverContext::new(Arc::new(cache_subsystem(policy)), 17);
    let s = Arc::clone(&ctx.subsystem);
    let structure = Structure::new(vec![access(&s, L1, BufferEvent::Miss)], BTreeMap::new()).unwrap();
    let result = ctx.solve(&structure);
    assert!(result.reason().unwrap().starts_with("Miss constraint violation"));
}

#[rstest]
#[case(ReplacementPolicy::Lru, 4, 4)]
#[case(ReplacementPolicy::Fifo, 4, 9)]
#[case(ReplacementPolicy::Plru, 2, 2)]
#[case(ReplacementPolicy::Mru, 1, 1)]
#[case(ReplacementPolicy::Random, 1, 1)]
fn primed_hits_per_set_follow_the_policy(
    #[case] policy: ReplacementPolicy,
    #[case] capacity: usize,
    #[case] loads: usize,
) {
    let mut ctx = SolverContext::new(Arc::new(cache_subsystem(policy)), 18);
    let s = Arc::clone(&ctx.subsystem);
    let hits = |n: usize| (0..n).map(|_| access(&s, L1, BufferEvent::Hit)).collect::<Vec<_>>();

    let solution = sat(ctx.solve(&all_related(&s, hits(capacity), L1, HazardType::TagNotEqual)));
    assert_eq!(solution.loader().len(), loads);
    let _ = replay(&s, &solution, L1);

    let result = ctx.solve(&all_related(&s, hits(capacity + 1), L1, HazardType::TagNotEqual));
    assert!(result.reason().unwrap().starts_with("Hit constraint violation"), "{policy:?}");
}

// ══════════════════════════════════════════════════════════
// 4. Layout
// ══════════════════════════════════════════════════════════

#[test]
fn region_bounds_the_access_and_its_evictions() {
    let mut ctx = SolverContext::new(lru_cache(), 8);
    ctx.settings.regions = vec![RegionSettings::new("low", RegionKind::Virtual, 0x00, 0x7F)];
    let s = Arc::clone(&ctx.subsystem);
    let structure = Structure::new(vec![access(&s, L1, BufferEvent::Miss)], BTreeMap::new()).unwrap();
    let solution = sat(ctx.solve(&structure));
    assert!(address(&solution, 0, L1) <= 0x7F);
    assert!(solution.loader().loads().iter().all(|l| l.address <= 0x7F));
}

#[test]
fn region_too_small_for_the_evictions_is_unsat() {
    let mut ctx = SolverContext::new(lru_cache(), 9);
    ctx.settings.regions = vec![RegionSettings::new("tiny", RegionKind::Virtual, 0x00, 0x3F)];
    let s = Arc::clone(&ctx.subsystem);
    let structure = Structure::new(vec![access(&s, L1, BufferEvent::Miss)], BTreeMap::new()).unwrap();
    let result = ctx.solve(&structure);
    assert!(result.reason().unwrap().starts_with("Miss constraint violation"));
}

#[test]
fn disabled_region_leaves_no_choice() {
    let mut ctx = SolverContext::new(lru_cache(), 10);
    let mut region = RegionSettings::new("off", RegionKind::Virtual, 0x00, 0xFF);
    region.enabled = false;
    ctx.settings.regions = vec![region];
    let s = Arc::clone(&ctx.subsystem);
    let structure = Structure::new(vec![access(&s, L1, BufferEvent::Hit)], BTreeMap::new()).unwrap();
    assert!(!ctx.solve(&structure).is_sat());
}

#[test]
fn preferred_alignment_clears_low_bits() {
    let mut ctx = SolverContext::new(lru_cache(), 11);
    ctx.settings.align = Some(DataType::Word);
    let s = Arc::clone(&ctx.subsystem);
    for seed_access in 0..4 {
        let structure = Structure::new(vec![access(&s, L1, BufferEvent::Hit)], BTreeMap::new()).unwrap();
        let solution = sat(ctx.solve(&structure));
        assert_eq!(address(&solution, 0, L1) & 0x3, 0, "run {seed_access}");
    }
}

// ══════════════════════════════════════════════════════════
// 5. Entries of non-replaceable buffers
// ══════════════════════════════════════════════════════════

#[test]
fn tag_equal_hits_share_one_entry() {
    let mut ctx = SolverContext::new(Arc::new(tlb_subsystem()), 12);
    let s = Arc::clone(&ctx.subsystem);
    let structure = related(
        &s,
        access(&s, TLB, BufferEvent::Hit),
        access(&s, TLB, BufferEvent::Hit),
        TLB,
        HazardType::TagEqual,
    );
    let solution = sat(ctx.solve(&structure));
    assert_eq!(solution.entries().len(), 1);
    let entry = &solution.entries()[0];
    assert!(entry.id() < s.buffer(TLB).capacity() as u64);
    assert!(entry.field(pfn(&s)).is_some());
    assert_eq!(entry.referrers(), &BTreeSet::from([0, 1]));
    for i in 0..2 {
        let l = lookup(solution.structure().access(i).path(), TLB);
        assert_eq!(solution.address_object(i).entry(&l), Some(0));
    }
}

#[test]
fn different_sets_use_different_entries() {
    let mut ctx = SolverContext::new(Arc::new(tlb_subsystem()), 13);
    let s = Arc::clone(&ctx.subsystem);
    let structure = related(
        &s,
        access(&s, TLB, BufferEvent::Hit),
        access(&s, TLB, BufferEvent::Hit),
        TLB,
        HazardType::IndexNotEqual,
    );
    let solution = sat(ctx.solve(&structure));
    let ids: BTreeSet<u64> = solution.entries().iter().map(|e| e.id()).collect();
    assert_eq!(ids.len(), 2);
    let tlb = s.buffer(TLB);
    assert_ne!(tlb.index_of(address(&solution, 0, TLB)), tlb.index_of(address(&solution, 1, TLB)));
}

#[test]
fn non_replaceable_miss_allocates_nothing() {
    let mut ctx = SolverContext::new(Arc::new(tlb_subsystem()), 14);
    let s = Arc::clone(&ctx.subsystem);
    let structure = Structure::new(vec![access(&s, TLB, BufferEvent::Miss)], BTreeMap::new()).unwrap();
    let solution = sat(ctx.solve(&structure));
    assert!(solution.entries().is_empty());
    assert!(solution.loader().is_empty());
}

// ══════════════════════════════════════════════════════════
// 6. Views
// ══════════════════════════════════════════════════════════

#[test]
fn view_miss_fills_auxiliary_parent_entries() {
    let mut ctx = SolverContext::new(Arc::new(view_subsystem()), 19);
    let s = Arc::clone(&ctx.subsystem);
    let structure = Structure::new(vec![view_access(&s, BufferEvent::Miss)], BTreeMap::new()).unwrap();
    let solution = sat(ctx.solve(&structure));
    let own = solution
        .address_object(0)
        .entry(&lookup(solution.structure().access(0).path(), JTLB))
        .unwrap();

    let evicting: Vec<_> = solution.loader().loads_for(UTLB).collect();
    assert_eq!(evicting.len(), 2);
    for load in &evicting {
        assert_eq!(load.event, BufferEvent::Miss);
        let e = load.entry.unwrap();
        assert_ne!(e, own);
        let entry = &solution.entries()[e];
        assert_eq!(entry.buffer(), JTLB);
        assert_eq!(entry.address(), Some(load.address));
        assert!(entry.field(pfn(&s)).is_some());
        assert!(entry.is_auxiliary());
    }
    assert_eq!(solution.entries().len(), 3);
    let _ = replay(&s, &solution, UTLB);
}

#[test]
fn tag_replaced_view_lookup_uses_the_evicted_parent_entry() {
    let mut ctx = SolverContext::new(Arc::new(view_subsystem()), 20);
    let s = Arc::clone(&ctx.subsystem);
    let structure = related(
        &s,
        view_access(&s, BufferEvent::Miss),
        view_access(&s, BufferEvent::Miss),
        UTLB,
        HazardType::TagReplaced,
    );
    let solution = sat(ctx.solve(&structure));
    let utlb = s.buffer(UTLB);
    let first = solution.loader().loads_for(UTLB).next().unwrap();
    assert_eq!(utlb.tag_of(address(&solution, 1, UTLB)), utlb.tag_of(first.address));

    let parent = lookup(solution.structure().access(1).path(), JTLB);
    assert_eq!(solution.address_object(1).entry(&parent), first.entry);
    assert!(solution.entries()[first.entry.unwrap()].referrers().contains(&1));
    assert_eq!(solution.entries().len(), 3);
    let evicted = replay(&s, &solution, UTLB);
    assert_eq!(evicted[0], Some(utlb.tag_of(first.address)));
}

#[test]
fn tag_equal_view_hits_share_the_parent_entry() {
    let mut ctx = SolverContext::new(Arc::new(view_subsystem()), 21);
    let s = Arc::clone(&ctx.subsystem);
    let structure = related(
        &s,
        view_access(&s, BufferEvent::Hit),
        view_access(&s, BufferEvent::Hit),
        UTLB,
        HazardType::TagEqual,
    );
    let solution = sat(ctx.solve(&structure));
    assert_eq!(solution.entries().len(), 1);
    assert_eq!(solution.entries()[0].buffer(), JTLB);
    assert_eq!(solution.entries()[0].referrers(), &BTreeSet::from([0, 1]));
    for i in 0..2 {
        let parent = lookup(solution.structure().access(i).path(), JTLB);
        assert_eq!(parent.event, BufferEvent::Read);
        assert_eq!(solution.address_object(i).entry(&parent), Some(0));
    }
    let loads = solution.loader().loads();
    assert_eq!(loads.len(), 1);
    assert_eq!((loads[0].buffer, loads[0].entry), (UTLB, Some(0)));
}

// ══════════════════════════════════════════════════════════
// 7. Properties
// ══════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn tag_equal_holds_for_any_address(seed in 1u64..u64::MAX, va in 0u64..=0xFF) {
        let mut ctx = SolverContext::new(lru_cache(), seed);
        let s = Arc::clone(&ctx.subsystem);
        let structure = related(
            &s,
            access_at(&s, L1, BufferEvent::Hit, va),
            access(&s, L1, BufferEvent::Hit),
            L1,
            HazardType::TagEqual,
        );
        let solution = sat(ctx.solve(&structure));
        let l1 = s.buffer(L1);
        let second = address(&solution, 1, L1);
        prop_assert_eq!(l1.tag_of(second), l1.tag_of(va));
        prop_assert_eq!(l1.index_of(second), l1.index_of(va));
    }

    #[test]
    fn index_not_equal_separates_sets(seed in 1u64..u64::MAX) {
        let mut ctx = SolverContext::new(lru_cache(), seed);
        let s = Arc::clone(&ctx.subsystem);
        let structure = related(
            &s,
            access(&s, L1, BufferEvent::Miss),
            access(&s, L1, BufferEvent::Miss),
            L1,
            HazardType::IndexNotEqual,
        );
        let solution = sat(ctx.solve(&structure));
        let l1 = s.buffer(L1);
        prop_assert_ne!(l1.index_of(address(&solution, 0, L1)), l1.index_of(address(&solution, 1, L1)));
        prop_assert_eq!(solution.loader().len(), 8);
    }

    #[test]
    fn miss_never_reuses_a_tag_of_its_set(
        seed in 1u64..u64::MAX,
        n in 2usize..=3,
        not_replaced in any::<bool>(),
    ) {
        let mut ctx = SolverContext::new(lru_cache(), seed);
        let s = Arc::clone(&ctx.subsystem);
        let ty = if not_replaced { HazardType::TagNotReplaced } else { HazardType::TagNotEqual };
        let misses = (0..n).map(|_| access(&s, L1, BufferEvent::Miss)).collect();
        let solution = sat(ctx.solve(&all_related(&s, misses, L1, ty)));
        let evicted = replay(&s, &solution, L1);
        let l1 = s.buffer(L1);
        for j in 1..n {
            prop_assert_ne!(evicted[0], Some(l1.tag_of(address(&solution, j, L1))));
        }
    }
}

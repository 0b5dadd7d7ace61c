//! Allocator Unit Tests.
//!
//! Entry ids are unique per buffer below capacity and reusable after a reset; evicting
//! addresses keep everything but the tag and never repeat a tag.

use std::collections::BTreeSet;

use mmutest_core::allocator::{AddressAllocator, AllocError, AllocationTable, EntryIdAllocator};
use mmutest_core::common::Randomizer;
use mmutest_core::config::{RegionKind, RegionSettings};
use mmutest_core::model::ReplacementPolicy;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::common::builder::{L1, TLB, cache_subsystem, tlb_subsystem};

proptest! {
    #[test]
    fn entry_ids_are_unique_until_capacity(seed in 1u64..u64::MAX) {
        let s = tlb_subsystem();
        let mut rng = Randomizer::new(seed);
        let mut ids = EntryIdAllocator::new();
        let capacity = s.buffer(TLB).capacity();
        let issued: BTreeSet<u64> = (0..capacity).map(|_| ids.allocate(&s, TLB, &mut rng).unwrap()).collect();
        prop_assert_eq!(issued.len(), capacity);
        prop_assert!(issued.iter().all(|&id| id < capacity as u64));
        prop_assert!(ids.allocate(&s, TLB, &mut rng).is_err());
    }

    #[test]
    fn entry_ids_are_reusable_after_reset(seed in 1u64..u64::MAX) {
        let s = tlb_subsystem();
        let mut rng = Randomizer::new(seed);
        let mut ids = EntryIdAllocator::new();
        for _ in 0..s.buffer(TLB).capacity() {
            let _ = ids.allocate(&s, TLB, &mut rng).unwrap();
        }
        ids.reset();
        prop_assert_eq!(ids.issued(TLB), 0);
        prop_assert!(ids.allocate(&s, TLB, &mut rng).is_ok());
        prop_assert_eq!(ids.issued(TLB), 1);
    }

    #[test]
    fn evicting_addresses_share_set_and_differ_in_tag(seed in 1u64..u64::MAX, address in 0u64..=0xFF) {
        let s = cache_subsystem(ReplacementPolicy::Lru);
        let l1 = s.buffer(L1);
        let mut rng = Randomizer::new(seed);
        let mut allocator = AddressAllocator::new(64);
        let exclude = BTreeSet::from([l1.tag_of(address)]);
        let mut tags = BTreeSet::new();
        for _ in 0..15 {
            let issued = allocator.allocate_tag(&s, L1, address, None, &exclude, &mut rng).unwrap();
            prop_assert_eq!(l1.index_of(issued), l1.index_of(address));
            prop_assert_eq!(l1.offset_of(issued), l1.offset_of(address));
            prop_assert!(tags.insert(l1.tag_of(issued)));
        }
        prop_assert!(!tags.contains(&l1.tag_of(address)));
        let exhausted = allocator.allocate_tag(&s, L1, address, None, &exclude, &mut rng);
        prop_assert!(exhausted.is_err());
    }
}

#[test]
fn region_restricts_evicting_addresses() {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let l1 = s.buffer(L1);
    let mut rng = Randomizer::new(7);
    let mut allocator = AddressAllocator::new(64);
    let region = RegionSettings::new("low", RegionKind::Virtual, 0x00, 0x3F);
    let mut issued = Vec::new();
    while let Ok(a) = allocator.allocate_tag(&s, L1, 0x15, Some(&region), &BTreeSet::new(), &mut rng) {
        issued.push(a);
    }
    issued.sort_unstable();
    assert_eq!(issued, vec![0x05, 0x15, 0x25, 0x35]);
    assert!(issued.iter().all(|&a| l1.index_of(a) == 1));
}

#[test]
fn allocator_reset_forgets_issued_tags() {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let mut rng = Randomizer::new(11);
    let mut allocator = AddressAllocator::new(64);
    let exclude = BTreeSet::new();
    for _ in 0..16 {
        let _ = allocator.allocate_tag(&s, L1, 0x00, None, &exclude, &mut rng).unwrap();
    }
    assert!(allocator.allocate_tag(&s, L1, 0x00, None, &exclude, &mut rng).is_err());
    allocator.reset();
    assert!(allocator.allocate_tag(&s, L1, 0x00, None, &exclude, &mut rng).is_ok());
}

#[test]
fn table_reports_exhaustion() {
    let mut rng = Randomizer::new(3);
    let mut table = AllocationTable::new("slots", [4u64, 4, 9]);
    assert_eq!(table.capacity(), 2);
    let a = table.allocate(&mut rng).unwrap();
    let b = table.allocate(&mut rng).unwrap();
    assert_eq!(BTreeSet::from([a, b]), BTreeSet::from([4, 9]));
    assert!(table.is_issued(&4));
    assert_eq!(
        table.allocate(&mut rng),
        Err(AllocError::Exhausted {
            resource: "slots".to_string(),
            capacity: 2
        })
    );
}

//! Model Unit Tests.
//!
//! Verifies builder validation (names, widths, fields, geometry, start action), the bit
//! selection of buffers and the JSON form of a subsystem.

use mmutest_core::Error;
use mmutest_core::model::{
    Buffer, BufferEvent, Condition, Field, Guard, ReplacementPolicy, Subsystem, SubsystemBuilder, Transition,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::builder::{L1, cache_subsystem, tlb_subsystem};

fn started() -> SubsystemBuilder {
    let mut b = SubsystemBuilder::new();
    let start = b.action("START", Vec::new());
    b.start(start);
    b
}

// ══════════════════════════════════════════════════════════
// 1. Builder validation
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(0)]
#[case(65)]
fn variable_width_outside_range_is_rejected(#[case] width: u32) {
    let mut b = started();
    let _ = b.variable("x", width);
    assert_eq!(
        b.build().unwrap_err(),
        Error::InvalidWidth {
            name: "x".to_string(),
            width
        }
    );
}

#[test]
fn duplicate_variable_is_rejected() {
    let mut b = started();
    let _ = b.variable("x", 8);
    let _ = b.variable("x", 4);
    assert!(matches!(b.build(), Err(Error::DuplicateName { kind: "variable", .. })));
}

#[test]
fn missing_start_action_is_rejected() {
    let mut b = SubsystemBuilder::new();
    let _ = b.action("A", Vec::new());
    assert!(matches!(b.build(), Err(Error::MalformedModel(_))));
}

#[test]
fn buffer_field_beyond_its_variable_is_rejected() {
    let mut b = started();
    let va = b.address("VA", 8);
    let var = b.address_var(va).unwrap();
    let _ = b.buffer(Buffer {
        name: "L1".to_string(),
        address: va,
        ways: 1,
        sets: 1,
        tag: Field::new(var, 4, 8).into(),
        index: Field::new(var, 2, 3).into(),
        offset: Field::new(var, 0, 1).into(),
        fields: Vec::new(),
        replaceable: true,
        policy: ReplacementPolicy::Lru,
        parent: None,
    });
    assert_eq!(
        b.build().unwrap_err(),
        Error::FieldOutOfRange {
            var: "VA".to_string(),
            lo: 4,
            hi: 8,
            width: 8
        }
    );
}

#[test]
fn buffer_without_ways_is_rejected() {
    let mut b = started();
    let va = b.address("VA", 8);
    let _ = b.buffer(Buffer {
        name: "L1".to_string(),
        address: va,
        ways: 0,
        sets: 4,
        tag: Default::default(),
        index: Default::default(),
        offset: Default::default(),
        fields: Vec::new(),
        replaceable: true,
        policy: ReplacementPolicy::Lru,
        parent: None,
    });
    assert!(matches!(b.build(), Err(Error::MalformedModel(_))));
}

#[test]
fn transition_to_unknown_action_is_rejected() {
    let mut b = started();
    let start = b.action("A", Vec::new());
    let _ = b.transition(Transition::new(start, mmutest_core::model::ActionId(7)));
    assert!(matches!(b.build(), Err(Error::DanglingReference(_))));
}

// ══════════════════════════════════════════════════════════
// 2. Buffer bit selection
// ══════════════════════════════════════════════════════════

#[test]
fn cache_splits_address_into_tag_index_offset() {
    let s = cache_subsystem(ReplacementPolicy::Lru);
    let l1 = s.buffer(L1);
    assert_eq!(l1.tag_of(0x1F), 0x1);
    assert_eq!(l1.index_of(0x1F), 0x3);
    assert_eq!(l1.offset_of(0x1F), 0x3);
    assert_eq!(l1.address_of(0x1, 0x3, 0x3), 0x1F);
    assert_eq!(l1.with_tag(0x1F, 0xA), 0xAF);
    assert_eq!(l1.capacity(), 16);
}

#[test]
fn read_resolves_as_hit() {
    assert_eq!(BufferEvent::Read.resolved(), BufferEvent::Hit);
    assert_eq!(BufferEvent::Miss.resolved(), BufferEvent::Miss);
}

#[test]
fn guard_filters_operation() {
    let guard = Guard::operation(mmutest_core::common::Operation::Load);
    assert!(guard.admits(mmutest_core::common::Operation::Load));
    assert!(!guard.admits(mmutest_core::common::Operation::Store));
    assert!(Guard::always().admits(mmutest_core::common::Operation::Store));
}

#[test]
fn event_guard_leaves_other_parts_open() {
    let guard = Guard::event(L1, BufferEvent::Miss).with_condition(Condition::all(Vec::new()));
    assert_eq!(guard.buffer, Some((L1, BufferEvent::Miss)));
    assert_eq!(guard.operation, None);
    assert_eq!(guard.region, None);
    assert!(guard.condition.is_some());
    assert!(guard.admits(mmutest_core::common::Operation::Store));
}

// ══════════════════════════════════════════════════════════
// 3. JSON form
// ══════════════════════════════════════════════════════════

#[test]
fn subsystem_survives_json() {
    let s = tlb_subsystem();
    let json = serde_json::to_string(&s).unwrap();
    let back: Subsystem = serde_json::from_str(&json).unwrap();
    assert_eq!(back.buffers(), s.buffers());
    assert_eq!(back.variables(), s.variables());
    assert_eq!(back.action_count(), s.action_count());
    assert_eq!(back.outgoing(back.start()).len(), 2);
}

#[test]
fn invalid_json_subsystem_is_rejected() {
    let json = r#"{ "variables": [{ "name": "x", "width": 0 }], "actions": [{ "name": "S" }], "start": 0 }"#;
    assert!(serde_json::from_str::<Subsystem>(json).is_err());
}

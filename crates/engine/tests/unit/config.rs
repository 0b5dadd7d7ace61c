//! Configuration Unit Tests.
//!
//! Verifies JSON defaults, region validation and constraint merging.

use mmutest_core::Error;
use mmutest_core::common::DataType;
use mmutest_core::config::{
    Classifier, EngineConfig, GeneratorSettings, IntegerConstraint, IntegerConstraintKind, IterationMode,
    MemoryAccessConstraints, RegionKind, RegionSettings,
};
use mmutest_core::model::BufferEvent;
use pretty_assertions::assert_eq;

use crate::common::builder::tlb_subsystem;

#[test]
fn empty_engine_config_takes_defaults() {
    let config: EngineConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(config.mode, IterationMode::Random);
    assert_eq!(config.classifier, Classifier::BufferEvents);
    assert_eq!(config.count_limit, None);
}

#[test]
fn engine_config_reads_lowercase_mode() {
    let config: EngineConfig =
        serde_json::from_str(r#"{ "mode": "exhaustive", "classifier": "trivial", "count_limit": 3 }"#).unwrap();
    assert_eq!(config.mode, IterationMode::Exhaustive);
    assert_eq!(config.classifier, Classifier::Trivial);
    assert_eq!(config.count_limit, Some(3));
}

#[test]
fn region_is_enabled_unless_stated() {
    let settings: GeneratorSettings = serde_json::from_str(
        r#"{ "regions": [{ "name": "user", "kind": "virtual", "min": 0, "max": 127 }], "align": "WORD" }"#,
    )
    .unwrap();
    assert_eq!(settings.regions, vec![RegionSettings::new("user", RegionKind::Virtual, 0, 127)]);
    assert_eq!(settings.align, Some(DataType::Word));
    assert_eq!(settings.page_mask, GeneratorSettings::default().page_mask);
    assert_eq!(settings.enabled_regions(RegionKind::Virtual).count(), 1);
    assert_eq!(settings.enabled_regions(RegionKind::Physical).count(), 0);
}

#[test]
fn inverted_region_is_rejected() {
    let settings = GeneratorSettings {
        regions: vec![RegionSettings::new("bad", RegionKind::Physical, 0x100, 0x10)],
        ..GeneratorSettings::default()
    };
    assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn duplicate_region_is_rejected() {
    let region = RegionSettings::new("ram", RegionKind::Physical, 0, 0xFF);
    let settings = GeneratorSettings {
        regions: vec![region.clone(), region],
        ..GeneratorSettings::default()
    };
    assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn integer_constraint_json_is_flat() {
    let c: IntegerConstraint = serde_json::from_str(r#"{ "variable": "VA", "type": "range", "min": 1, "max": 9 }"#).unwrap();
    assert_eq!(c, IntegerConstraint::range("VA", 1, 9));
    let c: IntegerConstraint = serde_json::from_str(r#"{ "variable": "VA", "type": "exclude", "values": [3] }"#).unwrap();
    assert_eq!(c.kind, IntegerConstraintKind::Exclude { values: vec![3] });
}

#[test]
fn merged_event_lists_intersect() {
    let a = MemoryAccessConstraints::default().with_events("TLB", [BufferEvent::Hit, BufferEvent::Miss]);
    let b = MemoryAccessConstraints::default()
        .with_events("TLB", [BufferEvent::Hit])
        .with_integer(IntegerConstraint::range("VA", 0, 15));
    let merged = a.merge(&b);
    assert_eq!(merged.events["TLB"].len(), 1);
    assert_eq!(merged.integers.len(), 1);

    let s = tlb_subsystem();
    let tlb = s.buffer_by_name("TLB").unwrap();
    assert!(merged.allows(&s, tlb, BufferEvent::Hit));
    assert!(!merged.allows(&s, tlb, BufferEvent::Miss));
}

#[test]
fn constraint_on_unknown_names_is_rejected() {
    let s = tlb_subsystem();
    let unknown_buffer = MemoryAccessConstraints::default().with_events("L2", [BufferEvent::Hit]);
    assert!(matches!(unknown_buffer.validate(&s), Err(Error::UnknownName { kind: "buffer", .. })));
    let unknown_var = MemoryAccessConstraints::default().with_integer(IntegerConstraint::range("PA", 0, 1));
    assert!(matches!(unknown_var.validate(&s), Err(Error::UnknownName { kind: "variable", .. })));
}

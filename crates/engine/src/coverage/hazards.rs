//! Structurally possible hazards between two buffer lookups.

use crate::access::hazard::{Hazard, HazardType};
use crate::access::path::BufferAccess;
use crate::model::{BufferEvent, Subsystem};

/// Hazard types that can hold between `primary` and `secondary` (same buffer).
///
/// A tagged buffer distinguishes equal and different tags within a set, and different
/// sets when it has more than one; a primary miss on a replaceable buffer additionally
/// replaces or keeps the secondary tag. A tagless buffer only distinguishes sets.
pub fn possible_types(subsystem: &Subsystem, primary: &BufferAccess, secondary: &BufferAccess) -> Vec<HazardType> {
    if primary.buffer != secondary.buffer {
        return Vec::new();
    }
    let buffer = subsystem.buffer(primary.buffer);
    let indexed = buffer.sets > 1 && !buffer.index.is_empty();
    let mut types = Vec::new();
    if buffer.has_tag() {
        if indexed {
            types.push(HazardType::IndexNotEqual);
        }
        types.push(HazardType::TagNotEqual);
        types.push(HazardType::TagEqual);
        if buffer.replaceable && primary.event == BufferEvent::Miss {
            types.push(HazardType::TagReplaced);
            types.push(HazardType::TagNotReplaced);
        }
    } else {
        types.push(HazardType::IndexEqual);
        if indexed {
            types.push(HazardType::IndexNotEqual);
        }
    }
    types
}

/// Hazards that can hold between `primary` and `secondary`.
pub fn possible_hazards(subsystem: &Subsystem, primary: &BufferAccess, secondary: &BufferAccess) -> Vec<Hazard> {
    possible_types(subsystem, primary, secondary)
        .into_iter()
        .map(|ty| Hazard::new(subsystem, ty, *primary, *secondary))
        .collect()
}

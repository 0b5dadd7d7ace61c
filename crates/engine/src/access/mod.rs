//! Access paths, accesses, hazards, dependencies and structures.
//!
//! These are immutable value types shared by the iterator and the solver:
//! 1. **Path:** A route through the subsystem graph with its derived sets.
//! 2. **Access:** An access type bound to a path and its constraints.
//! 3. **Hazard / Dependency:** Typed relations between lookups of the same buffer.
//! 4. **Structure:** Accesses plus the sparse dependency matrix.

/// Dependencies and united dependencies.
pub mod dependency;
/// Hazards and hazard types.
pub mod hazard;
/// Accesses.
pub mod memory_access;
/// Access paths and their builder.
pub mod path;
/// Structures.
pub mod structure;

pub use dependency::{Dependency, UnitedDependency, UnitedHazard};
pub use hazard::{Hazard, HazardCondition, HazardType};
pub use memory_access::Access;
pub use path::{AccessPath, AccessPathBuilder, AddressInstance, BufferAccess, PathEntry};
pub use structure::Structure;

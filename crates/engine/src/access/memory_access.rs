//! A single memory access: access type, path and constraints.

use std::fmt;
use std::sync::Arc;

use super::path::AccessPath;
use crate::common::AccessType;
use crate::config::MemoryAccessConstraints;

/// One access of a structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    ty: AccessType,
    path: Arc<AccessPath>,
    constraints: Arc<MemoryAccessConstraints>,
}

impl Access {
    /// Creates an access.
    pub const fn new(
        ty: AccessType,
        path: Arc<AccessPath>,
        constraints: Arc<MemoryAccessConstraints>,
    ) -> Self {
        Self {
            ty,
            path,
            constraints,
        }
    }

    /// Creates an unconstrained access.
    pub fn unconstrained(ty: AccessType, path: Arc<AccessPath>) -> Self {
        Self::new(ty, path, Arc::default())
    }

    /// Operation and data width.
    pub const fn ty(&self) -> AccessType {
        self.ty
    }

    /// Path through the subsystem.
    pub fn path(&self) -> &AccessPath {
        &self.path
    }

    /// Shared handle to the path.
    pub const fn shared_path(&self) -> &Arc<AccessPath> {
        &self.path
    }

    /// User constraints applying to this access.
    pub fn constraints(&self) -> &MemoryAccessConstraints {
        &self.constraints
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.path)
    }
}

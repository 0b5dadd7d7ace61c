//! Precondition violation errors.
//!
//! Structural infeasibility of a scenario is never reported through this type: checkers
//! answer `false` and the solver answers `SolverResult::Unsat`. `Error` is reserved for
//! inputs that cannot be processed at all:
//! 1. **Model validation:** Unknown names, dangling ids, bad widths or field ranges.
//! 2. **Structure shape:** Dependency matrices that do not match their accesses.
//! 3. **Configuration:** Settings and constraints that reference nothing or contradict themselves.

use thiserror::Error;

/// Errors raised by builders, constructors and configuration resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A name does not resolve to an entity of the expected kind.
    #[error("unknown {kind} `{name}`")]
    UnknownName {
        /// Kind of entity that was looked up (variable, buffer, ...).
        kind: &'static str,
        /// The name that failed to resolve.
        name: String,
    },

    /// Two entities share a name within the same namespace.
    #[error("duplicate {kind} `{name}`")]
    DuplicateName {
        /// Kind of entity (variable, buffer, ...).
        kind: &'static str,
        /// The repeated name.
        name: String,
    },

    /// A variable width outside `1..=64`.
    #[error("variable `{name}` has width {width}; widths must be in 1..=64")]
    InvalidWidth {
        /// Variable name.
        name: String,
        /// Declared width.
        width: u32,
    },

    /// A bit-field that does not fit its variable.
    #[error("field [{hi}:{lo}] is out of range for `{var}` ({width} bits)")]
    FieldOutOfRange {
        /// Variable name.
        var: String,
        /// Low bit.
        lo: u32,
        /// High bit.
        hi: u32,
        /// Variable width.
        width: u32,
    },

    /// Two sides of an assignment, binding or comparison disagree on width.
    #[error("width mismatch in {context}: {left} vs {right} bits")]
    WidthMismatch {
        /// Where the mismatch was found.
        context: String,
        /// Width of the left-hand side.
        left: u32,
        /// Width of the right-hand side.
        right: u32,
    },

    /// An id that does not index into the model.
    #[error("dangling reference: {0}")]
    DanglingReference(String),

    /// A model that is structurally unusable (no start action, bad buffer geometry, ...).
    #[error("malformed model: {0}")]
    MalformedModel(String),

    /// A structure whose dependency matrix does not match its accesses.
    #[error("malformed structure: {0}")]
    MalformedStructure(String),

    /// Settings or constraints that cannot be applied.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias for operations that can fail with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

//! In-memory model of a memory-management subsystem.
//!
//! The model is a guarded transition graph over bit-vector variables:
//! 1. **Expressions:** Variables, bit-fields and their concatenations.
//! 2. **Buffers:** Caches and TLBs with tag/index/offset selectors and entry fields.
//! 3. **Guards:** Operation filters, buffer events, bit-field conditions and regions.
//! 4. **Subsystem:** Actions, transitions and calls, validated by `SubsystemBuilder`.

/// Buffers and buffer events.
pub mod buffer;
/// Variables, fields and expressions.
pub mod expr;
/// Transition guards and conditions.
pub mod guard;
/// Subsystem graph and builder.
pub mod subsystem;

pub use buffer::{Buffer, BufferEvent, BufferId, ReplacementPolicy};
pub use expr::{Expression, Field, VarId, Variable};
pub use guard::{Atom, Condition, ConditionKind, Guard};
pub use subsystem::{
    Action, ActionId, Address, AddressId, Assignment, Call, ResultBinding, Rhs, Subsystem,
    SubsystemBuilder, Transition, TransitionId,
};

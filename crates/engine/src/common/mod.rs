//! Common types shared across the engine.

/// Bit-field helpers over `u64` values.
pub mod bits;
/// Access operations, data types and access types.
pub mod data;
/// Precondition violation errors.
pub mod error;
/// Seeded pseudo-random number generator.
pub mod random;
/// Serialization helpers for maps with structured keys.
pub mod serde_pairs;

pub use data::{AccessType, DataType, Operation};
pub use error::{Error, Result};
pub use random::Randomizer;

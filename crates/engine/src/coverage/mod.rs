//! Path coverage: extraction, classification and hazard enumeration.

/// Path classifiers.
pub mod classifier;
/// Depth-first path extraction.
pub mod extractor;
/// Structurally possible hazards.
pub mod hazards;

pub use classifier::classify;
pub use extractor::PathExtractor;
pub use hazards::{possible_hazards, possible_types};

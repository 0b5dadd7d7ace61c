//! Structure iteration.
//!
//! Candidate structures are produced lazily through the forward-only [`Cursor`] contract:
//! 1. **Classes:** Per-access choice of a path class (and a path within it).
//! 2. **Filters:** Cheap structural predicates rejecting impossible hazard combinations.
//! 3. **Checker:** Filters plus a symbolic satisfiability check.
//! 4. **Structures:** Product of class choices and per-pair dependency candidates.

/// Feasibility checks.
pub mod checker;
/// Path class combinations.
pub mod classes;
/// Structural filters.
pub mod filters;
/// Structure iterator.
pub mod structure;

pub use checker::StructureChecker;
pub use classes::ClassIterator;
pub use filters::FilterBuilder;
pub use structure::{IteratorStats, StructureIterator};

/// Forward-only iteration: `init` (re)starts, `value` reads the current element, `next`
/// advances and `stop` ends the iteration early.
///
/// ```text
/// cursor.init();
/// while cursor.has_value() {
///     consume(cursor.value());
///     cursor.next();
/// }
/// ```
pub trait Cursor {
    /// Element type.
    type Item;

    /// Starts (or restarts) the iteration and moves to the first element.
    fn init(&mut self);

    /// Returns whether there is a current element.
    fn has_value(&self) -> bool;

    /// The current element; only meaningful when [`Cursor::has_value`] holds.
    fn value(&self) -> Self::Item;

    /// Moves to the next element.
    fn next(&mut self);

    /// Ends the iteration; [`Cursor::has_value`] is `false` afterwards.
    fn stop(&mut self);

    /// Initializes the cursor and adapts it to [`Iterator`].
    fn into_values(self) -> Values<Self>
    where
        Self: Sized,
    {
        Values::new(self)
    }
}

/// A [`Cursor`] driven as an [`Iterator`].
#[derive(Debug)]
pub struct Values<C> {
    cursor: C,
}

impl<C: Cursor> Values<C> {
    /// Initializes `cursor` and wraps it.
    pub fn new(mut cursor: C) -> Self {
        cursor.init();
        Self { cursor }
    }

    /// The wrapped cursor.
    pub const fn cursor(&self) -> &C {
        &self.cursor
    }

    /// Unwraps the cursor.
    pub fn into_inner(self) -> C {
        self.cursor
    }
}

impl<C: Cursor> Iterator for Values<C> {
    type Item = C::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.cursor.has_value() {
            return None;
        }
        let value = self.cursor.value();
        Cursor::next(&mut self.cursor);
        Some(value)
    }
}

//! Path class combinations.
//!
//! Walks the product of per-access choices, the last access varying fastest. In random
//! mode each access chooses a class and a random representative of it is drawn every time
//! the class is entered; in exhaustive mode each access chooses among every path of every
//! class.

use std::sync::Arc;

use super::Cursor;
use crate::access::path::AccessPath;
use crate::common::Randomizer;
use crate::config::IterationMode;

/// Cursor over one path per access.
#[derive(Debug, Clone)]
pub struct ClassIterator {
    classes: Vec<Vec<Vec<Arc<AccessPath>>>>,
    flat: Vec<Vec<Arc<AccessPath>>>,
    mode: IterationMode,
    rng: Randomizer,
    indices: Vec<usize>,
    current: Vec<Arc<AccessPath>>,
    has_value: bool,
}

impl ClassIterator {
    /// Creates a cursor over the classes of each access.
    ///
    /// # Arguments
    ///
    /// * `classes` - Per access, the partition of its feasible paths.
    /// * `mode` - Random representatives or every path.
    /// * `rng` - Randomizer for representative selection.
    pub fn new(classes: Vec<Vec<Vec<Arc<AccessPath>>>>, mode: IterationMode, rng: Randomizer) -> Self {
        let flat = classes
            .iter()
            .map(|c| c.iter().flatten().cloned().collect())
            .collect();
        Self {
            classes,
            flat,
            mode,
            rng,
            indices: Vec::new(),
            current: Vec::new(),
            has_value: false,
        }
    }

    /// Number of choices of access `a`.
    fn choices(&self, a: usize) -> usize {
        match self.mode {
            IterationMode::Random => self.classes[a].len(),
            IterationMode::Exhaustive => self.flat[a].len(),
        }
    }

    fn pick(&mut self, a: usize) {
        let index = self.indices[a];
        let path = match self.mode {
            IterationMode::Random => {
                let class = &self.classes[a][index];
                Arc::clone(&class[self.rng.index(class.len())])
            }
            IterationMode::Exhaustive => Arc::clone(&self.flat[a][index]),
        };
        self.current[a] = path;
    }

    /// Number of accesses.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns whether there is no access.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Cursor for ClassIterator {
    type Item = Vec<Arc<AccessPath>>;

    fn init(&mut self) {
        let n = self.classes.len();
        self.indices = vec![0; n];
        self.has_value = (0..n).all(|a| self.choices(a) > 0);
        if !self.has_value {
            self.current.clear();
            return;
        }
        self.current = (0..n).map(|a| Arc::clone(&self.flat[a][0])).collect();
        for a in 0..n {
            self.pick(a);
        }
    }

    fn has_value(&self) -> bool {
        self.has_value
    }

    fn value(&self) -> Self::Item {
        self.current.clone()
    }

    fn next(&mut self) {
        if !self.has_value {
            return;
        }
        for a in (0..self.classes.len()).rev() {
            self.indices[a] += 1;
            if self.indices[a] < self.choices(a) {
                self.pick(a);
                for b in a + 1..self.classes.len() {
                    self.pick(b);
                }
                return;
            }
            self.indices[a] = 0;
        }
        self.has_value = false;
    }

    fn stop(&mut self) {
        self.has_value = false;
    }
}

//! Path classification.
//!
//! Classifiers partition extracted paths into equivalence classes; the structure
//! iterator then enumerates classes instead of individual paths. Classes keep the order in
//! which their first member was extracted.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::access::path::AccessPath;
use crate::config::Classifier;
use crate::model::{BufferEvent, BufferId};

/// Partitions `paths` according to `classifier`.
pub fn classify(classifier: Classifier, paths: &[Arc<AccessPath>]) -> Vec<Vec<Arc<AccessPath>>> {
    match classifier {
        Classifier::Trivial => paths.iter().map(|p| vec![Arc::clone(p)]).collect(),
        Classifier::BufferEvents => partition(paths, |p| {
            p.buffer_checks()
                .iter()
                .map(|a| (a.buffer, a.event))
                .collect::<Vec<(BufferId, BufferEvent)>>()
        }),
        Classifier::Buffers => partition(paths, |p| p.buffers().into_iter().collect::<BTreeSet<_>>()),
    }
}

fn partition<K: Ord>(
    paths: &[Arc<AccessPath>],
    key: impl Fn(&AccessPath) -> K,
) -> Vec<Vec<Arc<AccessPath>>> {
    let mut index: BTreeMap<K, usize> = BTreeMap::new();
    let mut classes: Vec<Vec<Arc<AccessPath>>> = Vec::new();
    for p in paths {
        let next = classes.len();
        let slot = *index.entry(key(p.as_ref())).or_insert(next);
        if slot == next {
            classes.push(Vec::new());
        }
        classes[slot].push(Arc::clone(p));
    }
    classes
}

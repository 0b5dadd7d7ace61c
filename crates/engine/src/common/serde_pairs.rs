//! Serializes maps with structured keys as sequences of `[key, value]` pairs.
//!
//! JSON objects only admit string keys, while solutions are keyed by address instances
//! and buffer accesses. Use with `#[serde(serialize_with = "serde_pairs::serialize")]`.

use std::collections::BTreeMap;

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

/// Writes `map` as a sequence of `(key, value)` tuples.
///
/// # Errors
///
/// Propagates any error raised by the underlying serializer.
pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    K: Serialize,
    V: Serialize,
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(map.len()))?;
    for entry in map {
        seq.serialize_element(&entry)?;
    }
    seq.end()
}

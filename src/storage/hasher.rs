//! Content fingerprints used to skip unchanged writes

use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use super::models::PartitionState;

/// Result of comparing a freshly computed hash with the last known one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashComparison {
    /// No previous hash, or a different one: the partition must be written
    Changed,
    /// Same hash as last time: the write can be skipped
    Unchanged,
}

/// SHA-256 fingerprinting over a canonical JSON serialization.
///
/// Object keys are sorted recursively so logically equal states hash equally
/// regardless of how their maps were built. Integral floats are written as
/// integers (`1.0` as `1`), matching JSON's single number type. An absent or
/// `null` state serializes as `{}`.
pub struct Hasher;

impl Hasher {
    /// Canonical serialization of a partition state
    pub fn serialize(state: Option<&PartitionState>) -> String {
        match state {
            None | Some(Value::Null) => "{}".to_string(),
            Some(value) => canonicalize(value).to_string(),
        }
    }

    /// Hex-encoded SHA-256 of the canonical serialization
    pub fn hash(state: Option<&PartitionState>) -> String {
        Self::digest(&Self::serialize(state))
    }

    /// Hex-encoded SHA-256 of an already serialized state
    pub fn digest(serialized: &str) -> String {
        format!("{:x}", Sha256::digest(serialized.as_bytes()))
    }

    /// Compare a fresh hash with the one carried from the last read or save
    pub fn compare(new_hash: &str, previous_hash: Option<&str>) -> HashComparison {
        match previous_hash {
            Some(previous) if previous == new_hash => HashComparison::Unchanged,
            _ => HashComparison::Changed,
        }
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key.clone(), canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Number(number) => Value::Number(normalize_number(number)),
        other => other.clone(),
    }
}

/// 2^53: beyond this not every integer has an exact `f64`
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn normalize_number(number: &Number) -> Number {
    match number.as_f64() {
        Some(float) if number.is_f64() && float.fract() == 0.0 && float.abs() < MAX_SAFE_INTEGER => {
            Number::from(float as i64)
        }
        _ => number.clone(),
    }
}

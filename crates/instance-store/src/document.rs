//! Nested field access on loosely-typed Kubernetes documents
//!
//! `DynamicObject::data` holds everything except `metadata` and type info as a
//! `serde_json::Value` tree; these helpers read and write paths inside it.

use serde_json::{Map, Value};
use thiserror::Error;

/// Path to the RedisFailover PVC spec
pub const PVC_SPEC_PATH: [&str; 5] = ["spec", "redis", "storage", "persistentVolumeClaim", "spec"];

/// Error returned when a path cannot be written
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot set {path}: '{segment}' is not a mapping")]
pub struct NestedFieldError {
    /// Full dotted path being written
    pub path: String,
    /// Segment whose value was not an object
    pub segment: String,
}

/// Look up a nested value
pub fn nested<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |current, key| current.get(key))
}

/// Look up a nested string; non-string values are treated as absent
pub fn nested_str<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a str> {
    nested(doc, path).and_then(Value::as_str)
}

/// Look up a nested integer; non-integer values are treated as absent
pub fn nested_i64(doc: &Value, path: &[&str]) -> Option<i64> {
    nested(doc, path).and_then(Value::as_i64)
}

/// Set a nested value, creating intermediate mappings as needed.
///
/// Fails without modifying anything if an existing intermediate value is not
/// a mapping.
pub fn set_nested(doc: &mut Value, path: &[&str], value: Value) -> Result<(), NestedFieldError> {
    let Some((last, parents)) = path.split_last() else {
        *doc = value;
        return Ok(());
    };

    let mut current = doc;
    for (depth, key) in parents.iter().enumerate() {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        let map = current.as_object_mut().ok_or_else(|| NestedFieldError {
            path: path.join("."),
            segment: parents[..depth].join("."),
        })?;
        current = map
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    let map = current.as_object_mut().ok_or_else(|| NestedFieldError {
        path: path.join("."),
        segment: parents.join("."),
    })?;
    map.insert((*last).to_string(), value);
    Ok(())
}

/// Extend a fixed base path with a relative suffix
pub fn join_path<'a>(base: &[&'a str], rest: &[&'a str]) -> Vec<&'a str> {
    base.iter().chain(rest).copied().collect()
}

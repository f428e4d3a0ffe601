//! # Result merging.
//!
//! Listener results are merged into one accumulator map per emission. Keys
//! must be disjoint: the engine never renames or overwrites, so listener
//! authors own their key namespaces. Any collision fails the emission with
//! the full set of offending keys.

use serde_json::{Map, Value};

use crate::error::DispatchError;

/// The merged result of one emission.
pub type MergedResult = Map<String, Value>;

/// Merges one listener's returned value into the accumulator.
///
/// The value must be a JSON object; its keys must be absent from the
/// accumulator. `listener` is the debug name used in error reporting.
pub(crate) fn merge_result(
    acc: &mut MergedResult,
    value: Value,
    listener: &str,
) -> Result<(), DispatchError> {
    let Value::Object(map) = value else {
        return Err(DispatchError::InvalidResult {
            listener: listener.to_string(),
            found: value_kind(&value),
        });
    };

    let mut conflicts: Vec<String> = map
        .keys()
        .filter(|k| acc.contains_key(*k))
        .cloned()
        .collect();
    if !conflicts.is_empty() {
        conflicts.sort();
        return Err(DispatchError::KeyConflict {
            listener: listener.to_string(),
            keys: conflicts,
        });
    }

    acc.extend(map);
    Ok(())
}

/// Human-readable kind of a JSON value, for error messages.
fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_disjoint_merge_is_union() {
        let mut acc = MergedResult::new();
        merge_result(&mut acc, json!({"a": 1}), "l1").unwrap();
        merge_result(&mut acc, json!({"b": 2, "c": 3}), "l2").unwrap();
        assert_eq!(Value::Object(acc), json!({"a": 1, "b": 2, "c": 3}));
    }

    #[test]
    fn test_conflict_names_all_offending_keys() {
        let mut acc = MergedResult::new();
        merge_result(&mut acc, json!({"a": 1, "b": 2}), "l1").unwrap();

        let err = merge_result(&mut acc, json!({"b": 9, "a": 9, "z": 0}), "l2").unwrap_err();
        match err {
            DispatchError::KeyConflict { listener, keys } => {
                assert_eq!(listener, "l2");
                assert_eq!(keys, ["a", "b"]);
            }
            other => panic!("expected KeyConflict, got {other:?}"),
        }
        // Accumulator untouched by the failed merge.
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_non_object_rejected() {
        let mut acc = MergedResult::new();
        let err = merge_result(&mut acc, json!([1, 2]), "l").unwrap_err();
        match err {
            DispatchError::InvalidResult { found, .. } => assert_eq!(found, "array"),
            other => panic!("expected InvalidResult, got {other:?}"),
        }
    }
}

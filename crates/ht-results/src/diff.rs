//! Field-by-field comparison of two snapshots.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::ResultsResult;
use crate::snapshot::SimulationSnapshot;

/// One leaf that differs. `None` means the path is absent on that side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub path: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

/// Compare status, inputs and outputs of two snapshots by flattened JSON
/// path (`inputs.config.phases[2].duration_s`). Identity fields (id,
/// version, timestamp) are left out.
pub fn diff_snapshots(
    a: &SimulationSnapshot,
    b: &SimulationSnapshot,
) -> ResultsResult<Vec<FieldChange>> {
    let before = flatten_snapshot(a)?;
    let after = flatten_snapshot(b)?;

    let mut changes = Vec::new();
    for (path, old) in &before {
        match after.get(path) {
            Some(new) if new == old => {}
            new => changes.push(FieldChange {
                path: path.clone(),
                before: Some(old.clone()),
                after: new.cloned(),
            }),
        }
    }
    for (path, new) in &after {
        if !before.contains_key(path) {
            changes.push(FieldChange {
                path: path.clone(),
                before: None,
                after: Some(new.clone()),
            });
        }
    }
    changes.sort_by(|x, y| x.path.cmp(&y.path));
    Ok(changes)
}

fn flatten_snapshot(s: &SimulationSnapshot) -> ResultsResult<BTreeMap<String, Value>> {
    let mut out = BTreeMap::new();
    flatten("status", &serde_json::to_value(&s.status)?, &mut out);
    flatten("input_hash", &Value::String(s.input_hash.clone()), &mut out);
    flatten("inputs", &serde_json::to_value(&s.inputs)?, &mut out);
    flatten("outputs", &serde_json::to_value(&s.outputs)?, &mut out);
    Ok(out)
}

fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (k, v) in map {
                flatten(&format!("{prefix}.{k}"), v, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, v) in items.iter().enumerate() {
                flatten(&format!("{prefix}[{i}]"), v, out);
            }
        }
        leaf => {
            out.insert(prefix.to_string(), leaf.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_uses_dotted_and_indexed_paths() {
        let mut out = BTreeMap::new();
        flatten(
            "inputs",
            &json!({"a": {"b": [1, {"c": 2}]}, "empty": []}),
            &mut out,
        );
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["inputs.a.b[0]", "inputs.a.b[1].c", "inputs.empty"]);
        assert_eq!(out["inputs.a.b[1].c"], json!(2));
    }
}

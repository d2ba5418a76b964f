//! Structural diff of two configuration trees.
//!
//! Mappings are descended key by key; sequences and scalars are compared as
//! a whole. Every difference is reported under its dotted key path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A key present on only one side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiffEntry {
    pub path: String,
    pub value: Value,
}

/// A key present on both sides with different values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub path: String,
    pub old_value: Value,
    pub new_value: Value,
}

/// Differences between an old and a new tree.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ValueDiff {
    /// Keys present in the new tree only
    pub added: Vec<DiffEntry>,
    /// Keys present in the old tree only
    pub removed: Vec<DiffEntry>,
    /// Keys present in both with different values
    pub changed: Vec<FieldChange>,
}

impl ValueDiff {
    /// Check if there are any changes.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Total number of changes.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }
}

impl fmt::Display for ValueDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No differences found.");
        }

        if !self.added.is_empty() {
            writeln!(f, "Added ({}):", self.added.len())?;
            for entry in &self.added {
                writeln!(f, "  + {}: {}", display_path(&entry.path), entry.value)?;
            }
        }

        if !self.removed.is_empty() {
            writeln!(f, "Removed ({}):", self.removed.len())?;
            for entry in &self.removed {
                writeln!(f, "  - {}: {}", display_path(&entry.path), entry.value)?;
            }
        }

        if !self.changed.is_empty() {
            writeln!(f, "Changed ({}):", self.changed.len())?;
            for change in &self.changed {
                writeln!(
                    f,
                    "  ~ {}: {} -> {}",
                    display_path(&change.path),
                    change.old_value,
                    change.new_value
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Summary: {} total changes", self.change_count())
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

/// Compare two trees.
///
/// ```
/// use serde_json::json;
/// use yamlconf::diff::diff_values;
///
/// let diff = diff_values(&json!({"a": 1, "b": {"c": 2}}), &json!({"a": 1, "b": {"c": 3}}));
/// assert_eq!(diff.changed.len(), 1);
/// assert_eq!(diff.changed[0].path, "b.c");
/// ```
pub fn diff_values(old: &Value, new: &Value) -> ValueDiff {
    let mut diff = ValueDiff::default();
    diff_at(old, new, "", &mut diff);
    diff
}

fn diff_at(old: &Value, new: &Value, path: &str, diff: &mut ValueDiff) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => diff_maps(old_map, new_map, path, diff),
        _ if values_equal(old, new) => {}
        _ => diff.changed.push(FieldChange {
            path: path.to_string(),
            old_value: old.clone(),
            new_value: new.clone(),
        }),
    }
}

fn diff_maps(old: &Map<String, Value>, new: &Map<String, Value>, path: &str, diff: &mut ValueDiff) {
    for (key, old_value) in old {
        let child = join(path, key);
        match new.get(key) {
            Some(new_value) => diff_at(old_value, new_value, &child, diff),
            None => diff.removed.push(DiffEntry {
                path: child,
                value: old_value.clone(),
            }),
        }
    }

    for (key, new_value) in new {
        if !old.contains_key(key) {
            diff.added.push(DiffEntry {
                path: join(path, key),
                value: new_value.clone(),
            });
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Check if two values are equal, with tolerance for floats.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => {
            if let (Some(fa), Some(fb)) = (na.as_f64(), nb.as_f64()) {
                (fa - fb).abs() < 1e-10
            } else {
                na == nb
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

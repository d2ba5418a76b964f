//! Merging of configuration layers.
//!
//! When several files in a hierarchy provide the same key, the value from the
//! file higher in the hierarchy wins:
//! - Scalars (and null) are replaced by the higher value
//! - Mappings are merged key by key, recursively by default
//! - Sequences are concatenated by default (lower entries first)
//!
//! A mapping or sequence can only be merged with a node of the same shape;
//! anything else is a [`ConfigError::MergeConflict`].

use crate::error::{ConfigError, Result, kind_name};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

/// How two mappings for the same key are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MappingStrategy {
    /// Merge nested mappings key by key at every depth (default).
    #[default]
    Deep,
    /// Merge the mapping under a top-level key one level deep; nested
    /// mappings below that level are replaced by the higher value.
    Shallow,
}

/// How two sequences for the same key are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SequenceStrategy {
    /// Concatenate: lower entries first, then higher entries (default).
    #[default]
    Append,
    /// The higher sequence replaces the lower one.
    Replace,
}

/// Merge policy for a hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergePolicy {
    #[serde(default)]
    pub mappings: MappingStrategy,
    #[serde(default)]
    pub sequences: SequenceStrategy,
}

impl MergePolicy {
    pub fn new(mappings: MappingStrategy, sequences: SequenceStrategy) -> Self {
        Self {
            mappings,
            sequences,
        }
    }
}

/// Merge two values where the key appears in more than one layer.
///
/// `current` is the value accumulated from the lower layers, `new` comes
/// from the next higher layer. `path` is the dotted key path, used for
/// diagnostics only.
///
/// # Example
/// ```
/// use serde_json::json;
/// use yamlconf::config::{MergePolicy, merge_values};
///
/// let base = json!({
///     "server": { "port": 8080, "host": "localhost" },
///     "features": ["a", "b"]
/// });
/// let overlay = json!({
///     "server": { "port": 9000 },
///     "features": ["c"]
/// });
/// let merged = merge_values(base, overlay, MergePolicy::default(), "").unwrap();
/// assert_eq!(merged, json!({
///     "server": { "port": 9000, "host": "localhost" },
///     "features": ["a", "b", "c"]
/// }));
/// ```
pub fn merge_values(current: Value, new: Value, policy: MergePolicy, path: &str) -> Result<Value> {
    match (current, new) {
        (Value::Object(mut current_map), Value::Object(new_map)) => {
            for (key, new_value) in new_map {
                match current_map.get_mut(&key) {
                    Some(slot) if policy.mappings == MappingStrategy::Deep => {
                        let current_value = std::mem::take(slot);
                        *slot = merge_values(current_value, new_value, policy, &join_key(path, &key))?;
                    }
                    Some(slot) => *slot = new_value,
                    None => {
                        current_map.insert(key, new_value);
                    }
                }
            }
            Ok(Value::Object(current_map))
        }
        (Value::Array(mut current_items), Value::Array(new_items)) => match policy.sequences {
            SequenceStrategy::Append => {
                current_items.extend(new_items);
                Ok(Value::Array(current_items))
            }
            SequenceStrategy::Replace => Ok(Value::Array(new_items)),
        },
        (current @ (Value::Object(_) | Value::Array(_)), new) => {
            let err = ConfigError::MergeConflict {
                path: path.to_string(),
                existing: kind_name(&current),
                incoming: kind_name(&new),
            };
            error!("{}", err);
            Err(err)
        }
        // Overwrite old value for simple types.
        (_, new) => Ok(new),
    }
}

/// Merge the top-level entries of `layer` into `data`, skipping `skip_key`.
///
/// Top-level keys of a layer are always merged with [`merge_values`]; the
/// mapping strategy only affects nested mappings.
pub fn merge_layer_into(
    data: &mut serde_json::Map<String, Value>,
    layer: serde_json::Map<String, Value>,
    policy: MergePolicy,
    skip_key: Option<&str>,
) -> Result<()> {
    for (key, value) in layer {
        if skip_key == Some(key.as_str()) {
            continue;
        }
        match data.get_mut(&key) {
            None => {
                debug!("Using key {} with value {}", key, value);
                data.insert(key, value);
            }
            Some(slot) => {
                let current = std::mem::take(slot);
                *slot = merge_values(current, value, policy, &key)?;
                debug!("Merged key {}: {}", key, slot);
            }
        }
    }
    Ok(())
}

/// Merge multiple layers in order (first is lowest, last has highest precedence).
pub fn merge_layers(layers: impl IntoIterator<Item = Value>, policy: MergePolicy) -> Result<Value> {
    let mut merged = Value::Null;
    for layer in layers {
        merged = match (merged, layer) {
            (Value::Object(mut data), Value::Object(layer)) => {
                merge_layer_into(&mut data, layer, policy, None)?;
                Value::Object(data)
            }
            (current, layer) => merge_values(current, layer, policy, "")?,
        };
    }
    Ok(merged)
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn merge(base: Value, overlay: Value) -> Value {
        merge_values(base, overlay, MergePolicy::default(), "").unwrap()
    }

    #[test]
    fn test_scalar_override() {
        let result = merge(json!({"timeout": 100}), json!({"timeout": 200}));
        assert_eq!(result["timeout"], 200);
    }

    #[test]
    fn test_scalar_replaced_by_mapping() {
        let result = merge(json!({"value": 42}), json!({"value": {"nested": true}}));
        assert_eq!(result, json!({"value": {"nested": true}}));
    }

    #[test]
    fn test_null_is_overwritten() {
        let result = merge(json!({"value": null}), json!({"value": [1]}));
        assert_eq!(result, json!({"value": [1]}));
    }

    #[test]
    fn test_nested_deep_merge() {
        let base = json!({"level1": {"level2": {"a": 1, "b": 2}}});
        let overlay = json!({"level1": {"level2": {"b": 3, "c": 4}}});
        let result = merge(base, overlay);
        assert_eq!(result, json!({"level1": {"level2": {"a": 1, "b": 3, "c": 4}}}));
    }

    #[test]
    fn test_shallow_mapping_merge_replaces_nested() {
        let policy = MergePolicy::new(MappingStrategy::Shallow, SequenceStrategy::Append);
        let base = json!({"server": {"tls": {"cert": "a", "key": "b"}, "port": 1}});
        let overlay = json!({"server": {"tls": {"cert": "c"}}});
        let result = merge_layers(vec![base, overlay], policy).unwrap();
        assert_eq!(result, json!({"server": {"tls": {"cert": "c"}, "port": 1}}));
    }

    #[test]
    fn test_sequences_appended_by_default() {
        let result = merge(json!({"items": [1, 2]}), json!({"items": [3]}));
        assert_eq!(result, json!({"items": [1, 2, 3]}));
    }

    #[test]
    fn test_sequences_replaced_with_policy() {
        let policy = MergePolicy::new(MappingStrategy::Deep, SequenceStrategy::Replace);
        let result = merge_values(json!({"items": [1, 2]}), json!({"items": [3]}), policy, "").unwrap();
        assert_eq!(result, json!({"items": [3]}));
    }

    #[test]
    fn test_mapping_vs_scalar_conflict_names_path() {
        let err = merge_values(
            json!({"server": {"tls": {"cert": "a"}}}),
            json!({"server": {"tls": "off"}}),
            MergePolicy::default(),
            "",
        )
        .unwrap_err();
        match err {
            ConfigError::MergeConflict {
                path,
                existing,
                incoming,
            } => {
                assert_eq!(path, "server.tls");
                assert_eq!(existing, "mapping");
                assert_eq!(incoming, "string");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sequence_vs_mapping_conflict() {
        let result = merge_values(json!([1]), json!({"a": 1}), MergePolicy::default(), "list");
        assert!(matches!(result, Err(ConfigError::MergeConflict { .. })));
    }

    #[test]
    fn test_merge_layer_into_skips_parent_key() {
        let mut data = json!({"a": 1}).as_object().cloned().unwrap();
        let layer = json!({"base": "other.yaml", "a": 2, "b": 3})
            .as_object()
            .cloned()
            .unwrap();
        merge_layer_into(&mut data, layer, MergePolicy::default(), Some("base")).unwrap();
        assert_eq!(Value::Object(data), json!({"a": 2, "b": 3}));
    }

    #[test]
    fn test_merge_layers_in_order() {
        let layers = vec![
            json!({"timeout": 100, "cache": {"mode": "off"}}),
            json!({"timeout": 200}),
            json!({"cache": {"mode": "on"}}),
        ];
        let result = merge_layers(layers, MergePolicy::default()).unwrap();
        assert_eq!(result, json!({"timeout": 200, "cache": {"mode": "on"}}));
    }

    #[test]
    fn test_merge_keeps_key_order_of_lower_layer() {
        let result = merge(json!({"b": 1, "a": 1, "c": 1}), json!({"a": 2, "d": 2}));
        let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a", "c", "d"]);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let layers = || {
            vec![
                json!({"z": 1, "a": {"y": [1], "b": 2}}),
                json!({"a": {"y": [2], "c": 3}, "m": true}),
            ]
        };
        let first = merge_layers(layers(), MergePolicy::default()).unwrap();
        let second = merge_layers(layers(), MergePolicy::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}

//! Key paths addressing nodes in a configuration tree.
//!
//! A key path is an ordered list of mapping keys, written in dotted form:
//! `paths.output` addresses `output` inside the `paths` mapping.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Ordered list of mapping keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// The empty path, addressing the root node.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Split into parent path and last key. `None` for the root.
    pub fn split_last(&self) -> Option<(&[String], &str)> {
        self.0
            .split_last()
            .map(|(last, parent)| (parent, last.as_str()))
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for KeyPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::root());
        }
        let keys: Vec<String> = s.split('.').map(|k| k.trim().to_string()).collect();
        if keys.iter().any(|k| k.is_empty()) {
            return Err(format!("Invalid key path '{}': empty segment", s));
        }
        Ok(Self(keys))
    }
}

impl TryFrom<String> for KeyPath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyPath> for String {
    fn from(path: KeyPath) -> Self {
        path.to_string()
    }
}

/// Test if a given key path exists in the config data.
///
/// ```
/// use serde_json::json;
/// use yamlconf::keypath::{KeyPath, contains_path};
///
/// let data = json!({ "test": { "hello": "world" } });
/// assert!(contains_path(&data, &KeyPath::new(["test", "hello"])));
/// assert!(!contains_path(&data, &KeyPath::new(["test", "bye"])));
/// ```
pub fn contains_path(data: &Value, path: &KeyPath) -> bool {
    get_value_for_path(data, path).is_some()
}

/// Get the config value for the given key path, if it exists.
///
/// ```
/// use serde_json::json;
/// use yamlconf::keypath::{KeyPath, get_value_for_path};
///
/// let data = json!({ "test": { "hello": "world" } });
/// let path: KeyPath = "test.hello".parse().unwrap();
/// assert_eq!(get_value_for_path(&data, &path), Some(&json!("world")));
/// ```
pub fn get_value_for_path<'a>(data: &'a Value, path: &KeyPath) -> Option<&'a Value> {
    let mut current = data;
    for key in path.keys() {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// Mutable variant of [`get_value_for_path`].
pub fn get_value_for_path_mut<'a>(data: &'a mut Value, path: &KeyPath) -> Option<&'a mut Value> {
    let mut current = data;
    for key in path.keys() {
        current = current.as_object_mut()?.get_mut(key)?;
    }
    Some(current)
}

/// Set the config value for an existing key path.
///
/// Only existing keys are updated. Returns `false` if any segment of the
/// path is missing, in which case `data` is left untouched.
///
/// ```
/// use serde_json::json;
/// use yamlconf::keypath::{KeyPath, get_value_for_path, set_value_for_path};
///
/// let mut data = json!({ "test": { "hello": "world" } });
/// let path: KeyPath = "test.hello".parse().unwrap();
/// assert!(set_value_for_path(&mut data, &path, json!("value")));
/// assert_eq!(get_value_for_path(&data, &path), Some(&json!("value")));
/// ```
pub fn set_value_for_path(data: &mut Value, path: &KeyPath, value: Value) -> bool {
    match get_value_for_path_mut(data, path) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

/// Insert a value at a key path, creating intermediate mappings.
///
/// Non-mapping nodes along the way are replaced by mappings. Used to build
/// override layers from flat key/value pairs.
pub fn insert_value_for_path(data: &mut Value, path: &KeyPath, value: Value) {
    let Some((parents, last)) = path.split_last() else {
        *data = value;
        return;
    };

    let mut current = data;
    for key in parents {
        current = ensure_mapping(current)
            .entry(key.clone())
            .or_insert(Value::Null);
    }
    ensure_mapping(current).insert(last.to_string(), value);
}

fn ensure_mapping(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by a mapping"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_and_display() {
        let path: KeyPath = "server.tls.cert".parse().unwrap();
        assert_eq!(path.keys(), &["server", "tls", "cert"]);
        assert_eq!(path.to_string(), "server.tls.cert");
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        assert!("server..cert".parse::<KeyPath>().is_err());
        assert!("server.".parse::<KeyPath>().is_err());
    }

    #[test]
    fn test_empty_string_is_root() {
        let path: KeyPath = "".parse().unwrap();
        assert!(path.is_root());
        let data = json!({"a": 1});
        assert_eq!(get_value_for_path(&data, &path), Some(&data));
    }

    #[test]
    fn test_get_through_scalar_is_none() {
        let data = json!({"a": 1});
        assert!(get_value_for_path(&data, &KeyPath::new(["a", "b"])).is_none());
    }

    #[test]
    fn test_set_missing_path_returns_false() {
        let mut data = json!({"test": {"hello": "world"}});
        assert!(!set_value_for_path(&mut data, &KeyPath::new(["test", "other"]), json!(1)));
        assert!(!set_value_for_path(&mut data, &KeyPath::new(["nope", "hello"]), json!(1)));
        assert_eq!(data, json!({"test": {"hello": "world"}}));
    }

    #[test]
    fn test_insert_creates_intermediate_mappings() {
        let mut data = json!({"server": {"host": "localhost"}});
        insert_value_for_path(&mut data, &KeyPath::new(["server", "tls", "enabled"]), json!(true));
        insert_value_for_path(&mut data, &KeyPath::new(["debug"]), json!(false));
        assert_eq!(
            data,
            json!({
                "server": {"host": "localhost", "tls": {"enabled": true}},
                "debug": false
            })
        );
    }

    #[test]
    fn test_insert_replaces_scalar_parent() {
        let mut data = json!({"server": "oops"});
        insert_value_for_path(&mut data, &KeyPath::new(["server", "port"]), json!(1));
        assert_eq!(data, json!({"server": {"port": 1}}));
    }

    #[test]
    fn test_serde_roundtrip_as_string() {
        let path: KeyPath = serde_json::from_value(json!("a.b")).unwrap();
        assert_eq!(path, KeyPath::new(["a", "b"]));
        assert_eq!(serde_json::to_value(&path).unwrap(), json!("a.b"));
    }
}

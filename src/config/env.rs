//! Environment variable overrides.
//!
//! With prefix `APP`, the variable `APP__SERVER__PORT=9000` overrides the key
//! path `server.port`. Values are parsed as YAML scalars, so `9000` becomes an
//! integer and `true` a boolean; anything that does not parse as a scalar is
//! kept as a string.

use crate::keypath::{KeyPath, insert_value_for_path};
use serde_json::Value;
use tracing::{debug, warn};

/// Separator between the prefix and key segments.
pub const ENV_SEPARATOR: &str = "__";

/// Build an override tree from the current process environment.
///
/// Returns `None` if no variable carries the prefix. Variables that are not
/// valid Unicode are ignored, and so are prefixed ones whose value is not.
pub fn env_overrides(prefix: &str) -> Option<Value> {
    let full_prefix = format!("{}{}", prefix, ENV_SEPARATOR);
    let vars = std::env::vars_os().filter_map(|(name, value)| {
        let name = name.into_string().ok()?;
        if !name.starts_with(&full_prefix) {
            return None;
        }
        match value.into_string() {
            Ok(value) => Some((name, value)),
            Err(_) => {
                warn!("Ignoring environment override {}: value is not valid UTF-8", name);
                None
            }
        }
    });
    env_overrides_from(vars, prefix)
}

/// Build an override tree from an explicit list of variables.
pub fn env_overrides_from<I, K, V>(vars: I, prefix: &str) -> Option<Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let full_prefix = format!("{}{}", prefix, ENV_SEPARATOR);
    let mut overrides: Vec<(KeyPath, Value)> = vars
        .into_iter()
        .filter_map(|(name, value)| {
            let rest = name.as_ref().strip_prefix(&full_prefix)?;
            let path = key_path_for(rest)?;
            Some((path, parse_scalar(value.as_ref())))
        })
        .collect();

    if overrides.is_empty() {
        return None;
    }

    // Process environment order is unspecified; sort for a deterministic tree.
    overrides.sort_by(|a, b| a.0.keys().cmp(b.0.keys()));

    let mut data = Value::Object(Default::default());
    for (path, value) in overrides {
        debug!("Environment override {} = {}", path, value);
        insert_value_for_path(&mut data, &path, value);
    }
    Some(data)
}

fn key_path_for(name: &str) -> Option<KeyPath> {
    let keys: Vec<String> = name
        .split(ENV_SEPARATOR)
        .map(|segment| segment.to_ascii_lowercase())
        .collect();
    if keys.iter().any(|k| k.is_empty()) {
        return None;
    }
    Some(KeyPath::new(keys))
}

fn parse_scalar(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => value,
        // `~`, empty strings, flow sequences and mappings stay literal
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overrides_build_nested_tree() {
        let vars = vec![
            ("APP__SERVER__PORT", "9000"),
            ("APP__SERVER__HOST", "example.org"),
            ("APP__DEBUG", "true"),
            ("OTHER__SERVER__PORT", "1"),
        ];
        let data = env_overrides_from(vars, "APP").unwrap();
        assert_eq!(
            data,
            json!({
                "debug": true,
                "server": {"host": "example.org", "port": 9000}
            })
        );
    }

    #[test]
    fn test_no_matching_variables() {
        let vars = vec![("PATH", "/usr/bin")];
        assert!(env_overrides_from(vars, "APP").is_none());
    }

    #[test]
    fn test_empty_segment_is_ignored() {
        let vars = vec![("APP____PORT", "1"), ("APP__", "2")];
        assert!(env_overrides_from(vars, "APP").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_variables_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let invalid = OsStr::from_bytes(b"\xff\xfe");
        // SAFETY: the names are unique to this test and no other test reads them.
        unsafe {
            std::env::set_var("YAMLCONF_ENV_TEST_OTHER", invalid);
            std::env::set_var("YAMLCONF_ENV_TEST__BROKEN", invalid);
            std::env::set_var("YAMLCONF_ENV_TEST__PORT", "9000");
        }

        let data = env_overrides("YAMLCONF_ENV_TEST").unwrap();
        assert_eq!(data, json!({"port": 9000}));

        unsafe {
            std::env::remove_var("YAMLCONF_ENV_TEST_OTHER");
            std::env::remove_var("YAMLCONF_ENV_TEST__BROKEN");
            std::env::remove_var("YAMLCONF_ENV_TEST__PORT");
        }
    }

    #[test]
    fn test_scalar_parsing() {
        assert_eq!(parse_scalar("42"), json!(42));
        assert_eq!(parse_scalar("1.5"), json!(1.5));
        assert_eq!(parse_scalar("false"), json!(false));
        assert_eq!(parse_scalar("hello world"), json!("hello world"));
        assert_eq!(parse_scalar("[1, 2]"), json!("[1, 2]"));
        assert_eq!(parse_scalar(""), json!(""));
    }
}

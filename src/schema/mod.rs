//! Schema validation of merged configuration trees.
//!
//! A [`Schema`] describes the expected shape of a configuration: field names,
//! types, required fields, defaults, allowed values, numeric bounds and
//! nested sub-schemas. Validation walks the whole tree and collects every
//! problem as a field-addressable [`ValidationError`](crate::error::ValidationError); it never stops at the
//! first one. On success the returned tree has every declared field filled in.

mod json;
mod types;

pub use types::{Field, FieldKind, UnknownKeyBehavior};

use crate::config::{LoaderOptions, YamlLoader};
use crate::error::{ConfigError, Result, ValidationErrors};
use json::join_path;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, error, warn};

/// Declarative description of a configuration document.
///
/// The root is always a mapping. Schemas can be built in code or read from
/// YAML:
///
/// ```
/// use serde_json::json;
/// use yamlconf::schema::{Field, Schema};
///
/// let schema = Schema::new()
///     .field("name", Field::string().required())
///     .field("port", Field::integer().default_value(8080).range(1.0, 65535.0));
///
/// let validated = schema.validate(&json!({"name": "api"})).unwrap();
/// assert_eq!(validated.value, json!({"name": "api", "port": 8080}));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    root: Field,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a successful validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validated {
    /// The configuration with defaults filled in.
    pub value: Value,
    /// Non-fatal findings, such as unknown keys under the `warn` policy.
    pub warnings: Vec<String>,
}

impl Validated {
    /// Deserialize the validated configuration into a typed model.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.value).map_err(|e| ConfigError::Model {
            model: std::any::type_name::<T>().to_string(),
            message: e.to_string(),
        })
    }
}

impl Schema {
    /// An empty schema: a root mapping with no declared fields.
    pub fn new() -> Self {
        Self {
            root: Field::mapping(),
        }
    }

    /// Wrap an existing field as a schema.
    ///
    /// Fails unless the field is a mapping or untyped; an untyped root is
    /// treated as a mapping.
    pub fn from_root(mut root: Field) -> Result<Self> {
        match root.kind {
            FieldKind::Mapping => {}
            FieldKind::Any => root.kind = FieldKind::Mapping,
            other => {
                return Err(ConfigError::InvalidSchema(format!(
                    "the root must be a mapping, not {}",
                    other
                )));
            }
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Field {
        &self.root
    }

    /// Declare a top-level field.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.root.fields.insert(name.into(), field);
        self
    }

    /// Set the unknown key policy for the root mapping.
    pub fn unknown_keys(mut self, behavior: UnknownKeyBehavior) -> Self {
        self.root.unknown_keys = behavior;
        self
    }

    /// The equivalent JSON Schema (draft 7) document.
    pub fn to_json_schema(&self) -> Value {
        json::field_schema(&self.root, false)
    }

    /// Parse a schema document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let root: Field =
            serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidSchema(e.to_string()))?;
        Self::from_root(root)
    }

    /// Read a schema document from a file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.to_path_buf())
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let root: Field = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_root(root)
    }

    /// Validate a configuration tree, collecting all errors.
    ///
    /// Defaults are filled in first and the filled tree is checked, so a
    /// default that breaks its own field's constraints is reported like any
    /// other value.
    pub fn validate(&self, value: &Value) -> std::result::Result<Validated, ValidationErrors> {
        let mut fill = Fill::default();
        let value = fill.node(&self.root, value, "");

        let errors = json::check(&self.root, &value);
        if errors.is_empty() {
            Ok(Validated {
                value,
                warnings: fill.warnings,
            })
        } else {
            Err(errors)
        }
    }
}

/// Load a hierarchical YAML file and validate it against `schema`.
///
/// Validation errors are logged and returned as [`ConfigError::Validation`];
/// warnings are logged.
pub fn load_validated(file: &Path, options: &LoaderOptions, schema: &Schema) -> Result<Validated> {
    let data = YamlLoader::new(options.clone()).load(file)?;
    match schema.validate(&data) {
        Ok(validated) => {
            for warning in &validated.warnings {
                warn!("{}: {}", file.display(), warning);
            }
            debug!("Validated configuration: {}", validated.value);
            Ok(validated)
        }
        Err(errors) => {
            error!("{}: {}", file.display(), errors);
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Fills defaults and collects unknown-key warnings. Checking is left to
/// the JSON Schema pass.
#[derive(Default)]
struct Fill {
    warnings: Vec<String>,
}

impl Fill {
    fn node(&mut self, field: &Field, value: &Value, path: &str) -> Value {
        match value {
            Value::Array(items) => match &field.items {
                Some(item_field) => Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| self.node(item_field, item, &format!("{}[{}]", path, i)))
                        .collect(),
                ),
                None => value.clone(),
            },
            Value::Object(map) if field.kind == FieldKind::Mapping => {
                Value::Object(self.mapping(field, map, path))
            }
            _ => value.clone(),
        }
    }

    fn mapping(&mut self, field: &Field, map: &Map<String, Value>, path: &str) -> Map<String, Value> {
        let mut out = Map::new();

        for (key, value) in map {
            let child_path = join_path(path, key);
            match field.fields.get(key) {
                Some(child) => {
                    if let Some(filled) = self.present(child, value, &child_path) {
                        out.insert(key.clone(), filled);
                    }
                }
                None => {
                    if field.unknown_keys == UnknownKeyBehavior::Warn {
                        self.warnings.push(format!("unknown field {}", child_path));
                    }
                    out.insert(key.clone(), value.clone());
                }
            }
        }

        for (key, child) in &field.fields {
            if map.contains_key(key) {
                continue;
            }
            if let Some(filled) = self.missing(child, &join_path(path, key)) {
                out.insert(key.clone(), filled);
            }
        }

        out
    }

    /// A declared key that is present. Null counts as absent.
    fn present(&mut self, field: &Field, value: &Value, path: &str) -> Option<Value> {
        if value.is_null() && field.kind != FieldKind::Any {
            return self.missing(field, path);
        }
        Some(self.node(field, value, path))
    }

    /// Value for a declared field that is absent. A required field without
    /// a default stays absent.
    fn missing(&mut self, field: &Field, path: &str) -> Option<Value> {
        if let Some(default) = &field.default {
            return Some(self.node(field, default, path));
        }
        if field.required {
            return None;
        }
        if field.kind == FieldKind::Mapping && !field.fields.is_empty() {
            // Optional section: fill its own defaults; its required fields
            // are reported by the check.
            return Some(Value::Object(self.mapping(field, &Map::new(), path)));
        }
        Some(Value::Null)
    }
}

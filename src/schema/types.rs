//! Declarative schema types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Expected type of a configuration node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Any value, including mappings and sequences.
    #[default]
    Any,
    String,
    /// Integral numbers only.
    Integer,
    /// Any number; integers are accepted.
    Float,
    Boolean,
    /// A file system path, written as a string.
    Path,
    Sequence,
    Mapping,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Any => "any",
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Path => "path",
            FieldKind::Sequence => "sequence",
            FieldKind::Mapping => "mapping",
        };
        write!(f, "{}", name)
    }
}

impl FieldKind {
    /// Whether `value` has this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Any => true,
            FieldKind::String | FieldKind::Path => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Float => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Sequence => value.is_array(),
            FieldKind::Mapping => value.is_object(),
        }
    }
}

/// Behavior for keys of a mapping that the schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKeyBehavior {
    /// Keep unknown keys silently.
    Allow,
    /// Keep unknown keys but report a warning (default).
    #[default]
    Warn,
    /// Reject unknown keys with a validation error.
    Reject,
}

/// Schema of one configuration node.
///
/// In YAML a field is written as a mapping:
///
/// ```yaml
/// port:
///   type: integer
///   default: 8080
///   min: 1
///   max: 65535
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Field {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// A required field must be present (and not null) unless it has a default.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// Value used when the field is absent or null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Value>>,
    /// Inclusive lower bound for numbers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numbers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Schema for every element of a sequence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Field>>,
    /// Children of a mapping.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Field>,
    /// Unknown keys of a mapping.
    pub unknown_keys: UnknownKeyBehavior,
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn any() -> Self {
        Self::new(FieldKind::Any)
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn path() -> Self {
        Self::new(FieldKind::Path)
    }

    pub fn mapping() -> Self {
        Self::new(FieldKind::Mapping)
    }

    /// A sequence whose elements follow `items`.
    pub fn sequence(items: Field) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::new(FieldKind::Sequence)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    /// Add a child field. Only meaningful for mappings.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn unknown_keys(mut self, behavior: UnknownKeyBehavior) -> Self {
        self.unknown_keys = behavior;
        self
    }
}

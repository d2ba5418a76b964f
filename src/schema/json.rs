//! Translation between [`Field`] trees and JSON Schema (draft 7).
//!
//! Type, required, choice, range and unknown-key checks are delegated to the
//! `jsonschema` validator. Its errors carry JSON pointers; they are mapped
//! back to dotted key paths and [`ErrorCode`]s here.

use super::types::{Field, FieldKind, UnknownKeyBehavior};
use crate::error::{ErrorCode, ValidationError, ValidationErrors};
use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

/// JSON Schema type keyword for a field kind. `Any` has none.
fn json_type(kind: FieldKind) -> Option<&'static str> {
    match kind {
        FieldKind::Any => None,
        FieldKind::String | FieldKind::Path => Some("string"),
        FieldKind::Integer => Some("integer"),
        FieldKind::Float => Some("number"),
        FieldKind::Boolean => Some("boolean"),
        FieldKind::Sequence => Some("array"),
        FieldKind::Mapping => Some("object"),
    }
}

/// Build the JSON Schema for a field.
///
/// An optional field without a default is emitted as `null` after filling,
/// so its schema admits null as well.
pub(crate) fn field_schema(field: &Field, nullable: bool) -> Value {
    let mut schema = Map::new();

    if let Some(description) = &field.description {
        schema.insert("description".into(), json!(description));
    }
    if let Some(name) = json_type(field.kind) {
        let types = if nullable { json!([name, "null"]) } else { json!(name) };
        schema.insert("type".into(), types);
    }
    if let Some(choices) = &field.choices {
        let mut options = choices.clone();
        if nullable && !options.contains(&Value::Null) {
            options.push(Value::Null);
        }
        schema.insert("enum".into(), Value::Array(options));
    }
    if let Some(min) = field.min {
        schema.insert("minimum".into(), json!(min));
    }
    if let Some(max) = field.max {
        schema.insert("maximum".into(), json!(max));
    }
    if let Some(items) = &field.items {
        schema.insert("items".into(), field_schema(items, is_nullable(items)));
    }

    if field.kind == FieldKind::Mapping {
        let properties: Map<String, Value> = field
            .fields
            .iter()
            .map(|(name, child)| (name.clone(), field_schema(child, is_nullable(child))))
            .collect();
        let required: Vec<&String> = field
            .fields
            .iter()
            .filter(|(_, child)| child.required)
            .map(|(name, _)| name)
            .collect();

        if !properties.is_empty() {
            schema.insert("properties".into(), Value::Object(properties));
        }
        if !required.is_empty() {
            schema.insert("required".into(), json!(required));
        }
        if field.unknown_keys == UnknownKeyBehavior::Reject {
            schema.insert("additionalProperties".into(), Value::Bool(false));
        }
    }

    Value::Object(schema)
}

fn is_nullable(field: &Field) -> bool {
    !field.required && field.default.is_none()
}

/// Validate a filled tree against `root`, collecting every error.
pub(crate) fn check(root: &Field, instance: &Value) -> ValidationErrors {
    let schema = field_schema(root, false);
    let mut errors = ValidationErrors::new();

    let compiled = match JSONSchema::options().with_draft(Draft::Draft7).compile(&schema) {
        Ok(compiled) => compiled,
        Err(e) => {
            errors.push(ValidationError::new(
                "",
                ErrorCode::InvalidSchema,
                format!("schema does not compile: {}", e),
            ));
            return errors;
        }
    };

    let found: Vec<ValidationError> = match compiled.validate(instance) {
        Ok(()) => return errors,
        Err(iter) => iter.flat_map(|e| convert(root, instance, &e)).collect(),
    };

    // A node of the wrong type also fails its enum and range checks; keep
    // the type error only.
    let mistyped: BTreeSet<String> = found
        .iter()
        .filter(|e| e.code == ErrorCode::InvalidType)
        .map(|e| e.path.clone())
        .collect();
    for error in found {
        let shadowed = error.code != ErrorCode::InvalidType && mistyped.contains(&error.path);
        if !shadowed && !errors.iter().any(|e| *e == error) {
            errors.push(error);
        }
    }
    errors
}

fn convert(root: &Field, instance: &Value, error: &jsonschema::ValidationError<'_>) -> Vec<ValidationError> {
    let steps = locate(instance, &error.instance_path.to_string());
    let path = dotted(&steps);
    let node = value_at(instance, &steps).unwrap_or(&Value::Null);
    let field = field_at(root, &steps);

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property.as_str().map(str::to_string).unwrap_or_else(|| property.to_string());
            vec![ValidationError::missing_field(&join_path(&path, &name))]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|key| ValidationError::unknown_field(&join_path(&path, key)))
            .collect(),
        ValidationErrorKind::Type { .. } => {
            let expected = field.map_or_else(|| "valid value".to_string(), |f| f.kind.to_string());
            vec![ValidationError::invalid_type(&path, &expected, node)]
        }
        ValidationErrorKind::Enum { .. } => {
            let choices = field.and_then(|f| f.choices.as_deref()).unwrap_or_default();
            vec![ValidationError::invalid_choice(&path, node, choices)]
        }
        ValidationErrorKind::Minimum { .. } | ValidationErrorKind::Maximum { .. } => {
            let (min, max) = field.map_or((None, None), |f| (f.min, f.max));
            vec![ValidationError::out_of_range(
                &path,
                node.as_f64().unwrap_or_default(),
                min,
                max,
            )]
        }
        _ => vec![ValidationError::new(path, ErrorCode::InvalidType, error.to_string())],
    }
}

enum Step {
    Key(String),
    Index(usize),
}

/// Split a JSON pointer into steps, using the instance to tell sequence
/// indices from numeric mapping keys.
fn locate(instance: &Value, pointer: &str) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut node = Some(instance);

    for raw in pointer.split('/').skip(1) {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        let step = match (node, segment.parse::<usize>()) {
            (Some(Value::Array(_)), Ok(index)) => Step::Index(index),
            _ => Step::Key(segment),
        };
        node = node.and_then(|n| match &step {
            Step::Index(index) => n.get(*index),
            Step::Key(key) => n.get(key.as_str()),
        });
        steps.push(step);
    }
    steps
}

fn dotted(steps: &[Step]) -> String {
    let mut path = String::new();
    for step in steps {
        match step {
            Step::Key(key) => path = join_path(&path, key),
            Step::Index(index) => path.push_str(&format!("[{}]", index)),
        }
    }
    path
}

fn value_at<'a>(instance: &'a Value, steps: &[Step]) -> Option<&'a Value> {
    steps.iter().try_fold(instance, |node, step| match step {
        Step::Index(index) => node.get(*index),
        Step::Key(key) => node.get(key.as_str()),
    })
}

fn field_at<'a>(root: &'a Field, steps: &[Step]) -> Option<&'a Field> {
    steps.iter().try_fold(root, |field, step| match step {
        Step::Index(_) => field.items.as_deref(),
        Step::Key(key) => field.fields.get(key),
    })
}

pub(crate) fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_admit_null() {
        let field = Field::mapping()
            .field("name", Field::string().required().description("service name"))
            .field("mode", Field::string().choices(["dev", "prod"]))
            .field("port", Field::integer().default_value(80).range(1.0, 65535.0))
            .unknown_keys(UnknownKeyBehavior::Reject);

        let schema = field_schema(&field, false);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["name"]));
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["properties"]["name"]["type"], "string");
        assert_eq!(schema["properties"]["name"]["description"], "service name");
        assert_eq!(schema["properties"]["mode"]["type"], json!(["string", "null"]));
        assert_eq!(schema["properties"]["mode"]["enum"], json!(["dev", "prod", null]));
        assert_eq!(schema["properties"]["port"]["type"], "integer");
        assert_eq!(schema["properties"]["port"]["maximum"], 65535.0);
    }

    #[test]
    fn test_any_has_no_type() {
        assert_eq!(field_schema(&Field::any(), true), json!({}));
    }

    #[test]
    fn test_pointer_to_dotted_path() {
        let instance = json!({"a": [{"0": {"x/y": 1}}]});
        let steps = locate(&instance, "/a/0/0/x~1y");
        assert_eq!(dotted(&steps), "a[0].0.x/y");
        assert_eq!(value_at(&instance, &steps), Some(&json!(1)));
        assert!(locate(&instance, "").is_empty());
    }

    #[test]
    fn test_non_finite_bound_is_a_schema_error() {
        let root = Field::mapping().field("ratio", Field::float().max(f64::NAN));
        let errors = check(&root, &json!({"ratio": 0.5}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors[0].code, ErrorCode::InvalidSchema);
    }
}

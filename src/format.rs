//! Output formatting for configuration trees, layers and validation reports.

use crate::config::Hierarchy;
use crate::error::ValidationErrors;
use crate::schema::Validated;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;

/// Output format for configuration trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Render any serializable value in the given format.
pub fn render<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(value)?;
            out.push('\n');
            out
        }
    })
}

/// Format the layers of a hierarchy, highest precedence first.
pub fn format_layers(hierarchy: &Hierarchy) -> String {
    let mut out = String::new();
    for layer in &hierarchy.layers {
        let keys = match &layer.data {
            Value::Object(map) => map.len(),
            _ => 0,
        };
        out.push_str(&format!("{:>3}  {}  ({} keys)\n", layer.rank, layer.source, keys));
    }
    out
}

/// Format a successful validation: its warnings, or a one-line confirmation.
pub fn format_validated(validated: &Validated) -> String {
    let mut out = String::new();
    for warning in &validated.warnings {
        out.push_str(&format!("warning: {}\n", warning));
    }
    out.push_str("Configuration is valid.\n");
    out
}

/// Format validation errors, one per line.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut out = String::new();
    for error in errors.iter() {
        out.push_str(&format!("error: {} [{}]\n", error, error_code_name(error)));
    }
    out.push_str(&format!("{} validation error(s)\n", errors.len()));
    out
}

fn error_code_name(error: &crate::error::ValidationError) -> String {
    serde_json::to_value(error.code)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Layer, LayerSource};
    use crate::error::ValidationError;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_render_yaml_and_json() {
        let value = json!({"hello": "world", "list": [1, 2]});
        let yaml = render(&value, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("hello: world"));
        assert!(yaml.contains("- 1"));

        let json = render(&value, OutputFormat::Json).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), value);
    }

    #[test]
    fn test_format_layers() {
        let hierarchy = Hierarchy {
            layers: vec![
                Layer {
                    source: LayerSource::Environment {
                        prefix: "APP".into(),
                    },
                    rank: 0,
                    data: json!({"a": 1}),
                },
                Layer {
                    source: LayerSource::File {
                        path: PathBuf::from("/cfg/app.yaml"),
                    },
                    rank: 1,
                    data: json!({"a": 2, "b": 3}),
                },
            ],
            merged: json!({"a": 1, "b": 3}),
        };

        let text = format_layers(&hierarchy);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "  0  environment (APP__*)  (1 keys)");
        assert_eq!(lines[1], "  1  /cfg/app.yaml  (2 keys)");
    }

    #[test]
    fn test_format_validation_errors() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::missing_field("name"));
        let text = format_validation_errors(&errors);
        assert!(text.contains("error: name: name is required [MISSING_FIELD]"));
        assert!(text.ends_with("1 validation error(s)\n"));
    }

    #[test]
    fn test_format_validated_warnings() {
        let validated = Validated {
            value: json!({}),
            warnings: vec!["unknown field x".into()],
        };
        assert_eq!(
            format_validated(&validated),
            "warning: unknown field x\nConfiguration is valid.\n"
        );
    }
}

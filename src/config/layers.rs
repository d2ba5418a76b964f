//! Loaded layers and their provenance.

use crate::keypath::{KeyPath, get_value_for_path};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a layer came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayerSource {
    /// A YAML file of the hierarchy.
    File { path: PathBuf },
    /// Overrides taken from environment variables with the given prefix.
    Environment { prefix: String },
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSource::File { path } => write!(f, "{}", path.display()),
            LayerSource::Environment { prefix } => write!(f, "environment ({}__*)", prefix),
        }
    }
}

/// One source of a configuration hierarchy.
#[derive(Debug, Clone, Serialize)]
pub struct Layer {
    pub source: LayerSource,
    /// Precedence rank: 0 is the highest precedence, larger ranks are lower
    /// in the hierarchy. The entry file has rank 0 unless environment
    /// overrides are present.
    pub rank: usize,
    /// Parsed content after relative path resolution.
    pub data: Value,
}

impl Layer {
    /// File path of this layer, if it was read from a file.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            LayerSource::File { path } => Some(path),
            LayerSource::Environment { .. } => None,
        }
    }
}

/// A fully loaded hierarchy: the layers in precedence order (highest first)
/// plus the merged configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Hierarchy {
    pub layers: Vec<Layer>,
    pub merged: Value,
}

impl Hierarchy {
    /// Paths of all file layers, highest precedence first.
    pub fn files(&self) -> Vec<&Path> {
        self.layers.iter().filter_map(Layer::path).collect()
    }

    /// The highest-precedence layer that defines `path`.
    ///
    /// For keys whose merged value combines several layers (mappings or
    /// appended sequences) this is the layer that contributed last.
    pub fn origin(&self, path: &KeyPath) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|layer| get_value_for_path(&layer.data, path).is_some())
    }

    /// Consume the hierarchy and return the merged configuration.
    pub fn into_value(self) -> Value {
        self.merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file_layer(path: &str, rank: usize, data: Value) -> Layer {
        Layer {
            source: LayerSource::File {
                path: PathBuf::from(path),
            },
            rank,
            data,
        }
    }

    #[test]
    fn test_origin_prefers_highest_layer() {
        let hierarchy = Hierarchy {
            layers: vec![
                file_layer("prod.yaml", 0, json!({"server": {"port": 9000}})),
                file_layer("base.yaml", 1, json!({"server": {"port": 80, "host": "x"}})),
            ],
            merged: json!({"server": {"port": 9000, "host": "x"}}),
        };

        let port = hierarchy.origin(&"server.port".parse().unwrap()).unwrap();
        assert_eq!(port.path(), Some(Path::new("prod.yaml")));

        let host = hierarchy.origin(&"server.host".parse().unwrap()).unwrap();
        assert_eq!(host.path(), Some(Path::new("base.yaml")));

        assert!(hierarchy.origin(&"missing".parse().unwrap()).is_none());
    }

    #[test]
    fn test_files_skips_environment_layer() {
        let hierarchy = Hierarchy {
            layers: vec![
                Layer {
                    source: LayerSource::Environment {
                        prefix: "APP".to_string(),
                    },
                    rank: 0,
                    data: json!({}),
                },
                file_layer("app.yaml", 1, json!({})),
            ],
            merged: json!({}),
        };
        assert_eq!(hierarchy.files(), vec![Path::new("app.yaml")]);
    }

    #[test]
    fn test_source_display() {
        let env = LayerSource::Environment {
            prefix: "APP".to_string(),
        };
        assert_eq!(env.to_string(), "environment (APP__*)");
    }
}

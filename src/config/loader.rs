//! Hierarchical YAML loading.
//!
//! A config file may name one or more parent files under the parent key
//! (default `base`). Parents are loaded recursively, depth first, and every
//! file becomes one layer of the hierarchy. The entry file has the highest
//! precedence; a parent has lower precedence than the file that includes it,
//! and of several listed parents the first one listed ranks highest.

use super::env::env_overrides;
use super::layers::{Hierarchy, Layer, LayerSource};
use super::merge::{MergePolicy, merge_layer_into};
use crate::error::{ConfigError, Result, kind_name};
use crate::keypath::{KeyPath, get_value_for_path_mut};
use crate::paths::{normalize_path, resolve_relative_to};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Default key used to reference included config files.
pub const DEFAULT_PARENT_KEY: &str = "base";

/// Options controlling how a hierarchy is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Key used to reference included config files.
    pub parent_key: String,
    /// Key paths whose string values are file paths relative to the config
    /// file that sets them. They are completed against that file's directory.
    pub relative_path_keys: Vec<KeyPath>,
    /// How layers are merged.
    pub merge: MergePolicy,
    /// If set, environment variables `<PREFIX>__A__B` override key `a.b`.
    pub env_prefix: Option<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            parent_key: DEFAULT_PARENT_KEY.to_string(),
            relative_path_keys: Vec::new(),
            merge: MergePolicy::default(),
            env_prefix: None,
        }
    }
}

impl LoaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent_key(mut self, key: impl Into<String>) -> Self {
        self.parent_key = key.into();
        self
    }

    pub fn with_relative_path_key(mut self, path: KeyPath) -> Self {
        self.relative_path_keys.push(path);
        self
    }

    pub fn with_relative_path_keys(mut self, paths: impl IntoIterator<Item = KeyPath>) -> Self {
        self.relative_path_keys.extend(paths);
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge = policy;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }
}

/// Load the content of a single YAML file.
///
/// Returns [`ConfigError::FileNotFound`] if the file does not exist. An empty
/// document yields `null`. Merge keys (`<<: *anchor`) are expanded. NaN and
/// infinite numbers have no place in the tree and are rejected.
pub fn load_yaml(file: &Path) -> Result<Value> {
    if !file.is_file() {
        return Err(invalid(ConfigError::FileNotFound(file.to_path_buf())));
    }

    let content = std::fs::read_to_string(file).map_err(|source| {
        invalid(ConfigError::Io {
            path: file.to_path_buf(),
            source,
        })
    })?;

    if content.trim().is_empty() {
        return Ok(Value::Null);
    }

    let parse_error = |source: serde_yaml::Error| {
        invalid(ConfigError::Parse {
            path: file.to_path_buf(),
            source,
        })
    };

    let mut document: serde_yaml::Value = serde_yaml::from_str(&content).map_err(parse_error)?;
    document.apply_merge().map_err(parse_error)?;

    if let Some(key) = non_finite_key(&document, "") {
        return Err(invalid(ConfigError::NonFiniteNumber {
            path: file.to_path_buf(),
            key,
        }));
    }

    Value::deserialize(document).map_err(parse_error)
}

/// Dotted path of the first NaN or infinite number in a YAML document.
fn non_finite_key(node: &serde_yaml::Value, path: &str) -> Option<String> {
    use serde_yaml::Value as Yaml;

    match node {
        Yaml::Number(n) if n.as_f64().is_some_and(|f| !f.is_finite()) => Some(path.to_string()),
        Yaml::Sequence(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, item)| non_finite_key(item, &format!("{}[{}]", path, i))),
        Yaml::Mapping(map) => map.iter().find_map(|(key, value)| {
            let key = match key {
                Yaml::String(s) => s.clone(),
                other => serde_yaml::to_string(other)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_default(),
            };
            let child = if path.is_empty() { key } else { format!("{}.{}", path, key) };
            non_finite_key(value, &child)
        }),
        Yaml::Tagged(tagged) => non_finite_key(&tagged.value, path),
        _ => None,
    }
}

/// Log a severe configuration error before handing it back.
fn invalid(err: ConfigError) -> ConfigError {
    error!("{}", err);
    err
}

/// Loader for hierarchical YAML config files.
#[derive(Debug, Clone, Default)]
pub struct YamlLoader {
    options: LoaderOptions,
}

/// Traversal state for one load.
#[derive(Default)]
struct LoadState {
    /// Visited files in traversal order (highest precedence first).
    files: Vec<PathBuf>,
    /// Parsed root mappings, parallel to `files`.
    data: Vec<Value>,
}

impl YamlLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Load a hierarchical YAML file and return the merged configuration.
    pub fn load(&self, file: &Path) -> Result<Value> {
        self.load_hierarchy(file).map(Hierarchy::into_value)
    }

    /// Load a hierarchical YAML file, keeping every layer for provenance.
    pub fn load_hierarchy(&self, file: &Path) -> Result<Hierarchy> {
        let mut state = LoadState::default();
        self.recursive_load(&normalize_path(file), &mut state)?;

        info!(
            "Config file layers:\n{}",
            state
                .files
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join("\n")
        );

        self.resolve_relative_paths(&state.files, &mut state.data)?;

        let mut layers: Vec<Layer> = Vec::new();
        if let Some(prefix) = &self.options.env_prefix
            && let Some(overrides) = env_overrides(prefix)
        {
            debug!("Environment overrides with prefix {}: {}", prefix, overrides);
            layers.push(Layer {
                source: LayerSource::Environment {
                    prefix: prefix.clone(),
                },
                rank: 0,
                data: overrides,
            });
        }
        let offset = layers.len();
        layers.extend(
            state
                .files
                .into_iter()
                .zip(state.data)
                .enumerate()
                .map(|(i, (path, data))| Layer {
                    source: LayerSource::File { path },
                    rank: i + offset,
                    data,
                }),
        );

        let merged = Value::Object(self.merge_config_data(&layers)?);
        info!("Resulting configuration:\n{}", merged);

        Ok(Hierarchy { layers, merged })
    }

    /// Recursively load the YAML hierarchy starting at `file`.
    fn recursive_load(&self, file: &Path, state: &mut LoadState) -> Result<()> {
        if state.files.iter().any(|f| f == file) {
            warn!(
                "Config file {} is inherited multiple times. It was already loaded and will be skipped now.",
                file.display()
            );
            return Ok(());
        }

        let data = match load_yaml(file)? {
            Value::Object(map) => map,
            other => {
                return Err(invalid(ConfigError::InvalidRoot {
                    path: file.to_path_buf(),
                    found: kind_name(&other),
                }));
            }
        };
        debug!("Config data from {}: {:?}", file.display(), data);

        let parents = self.parent_files(file, &data)?;

        state.files.push(file.to_path_buf());
        state.data.push(Value::Object(data));

        for parent in parents {
            debug!("Loading parent file {} of {}", parent.display(), file.display());
            self.recursive_load(&parent, state)?;
        }
        Ok(())
    }

    /// Parent files declared by `file`, resolved against its directory.
    fn parent_files(&self, file: &Path, data: &Map<String, Value>) -> Result<Vec<PathBuf>> {
        let key = &self.options.parent_key;
        let bad_parent = |found: &Value| {
            invalid(ConfigError::InvalidParent {
                path: file.to_path_buf(),
                key: key.clone(),
                found: format!("{} ({})", found, kind_name(found)),
            })
        };

        match data.get(key) {
            None => Ok(Vec::new()),
            Some(Value::String(parent)) => {
                debug!("{} has single parent file {}", file.display(), parent);
                Ok(vec![resolve_relative_to(file, Path::new(parent))])
            }
            Some(Value::Array(parents)) => {
                debug!("{} has multiple parent files: {:?}", file.display(), parents);
                parents
                    .iter()
                    .map(|p| match p {
                        Value::String(parent) => Ok(resolve_relative_to(file, Path::new(parent))),
                        other => Err(bad_parent(other)),
                    })
                    .collect()
            }
            Some(other) => Err(bad_parent(other)),
        }
    }

    /// Convert relative paths to paths anchored at the declaring file.
    fn resolve_relative_paths(&self, files: &[PathBuf], data: &mut [Value]) -> Result<()> {
        for (file, layer) in files.iter().zip(data.iter_mut()) {
            for key in &self.options.relative_path_keys {
                match get_value_for_path_mut(layer, key) {
                    Some(Value::String(relative)) => {
                        let resolved = resolve_relative_to(file, Path::new(relative.as_str()));
                        debug!(
                            "Resolving path {} to {} for config file {}.",
                            relative,
                            resolved.display(),
                            file.display()
                        );
                        *relative = resolved.to_string_lossy().into_owned();
                    }
                    Some(other) => {
                        return Err(invalid(ConfigError::InvalidPathValue {
                            path: file.clone(),
                            key: key.to_string(),
                            found: format!("{} ({})", other, kind_name(other)),
                        }));
                    }
                    None => {
                        debug!("No match for path {} for layer {}.", key, file.display());
                    }
                }
            }
        }
        Ok(())
    }

    /// Merge the layers, starting from the lowest one.
    fn merge_config_data(&self, layers: &[Layer]) -> Result<Map<String, Value>> {
        let parent_key = self.options.parent_key.as_str();
        let mut data = Map::new();

        for layer in layers.iter().rev() {
            let Value::Object(layer_data) = &layer.data else {
                continue;
            };
            debug!("Merging layer {} (rank {})", layer.source, layer.rank);
            merge_layer_into(&mut data, layer_data.clone(), self.options.merge, Some(parent_key))?;
        }

        Ok(data)
    }
}

//! Hierarchical configuration loading.
//!
//! Builds one configuration tree from a hierarchy of YAML files:
//! 1. **Loader** - reads the entry file and follows the parent key
//!    (default `base`) recursively, recording every file as a layer
//! 2. **Relative paths** - configured key paths are completed against the
//!    directory of the file that sets them
//! 3. **Merger** - folds the layers from lowest to highest precedence
//!
//! ## Merge Strategy
//! - Scalars: higher layer wins
//! - Mappings: merged key by key (deep by default, shallow on request)
//! - Sequences: concatenated by default, replaced on request
//!
//! ## Environment Variables
//! With [`LoaderOptions::with_env_prefix`], `<PREFIX>__A__B=value` overrides
//! key `a.b` on top of every file layer.

mod env;
mod layers;
mod loader;
mod merge;
pub mod watcher;

pub use env::{ENV_SEPARATOR, env_overrides, env_overrides_from};
pub use layers::{Hierarchy, Layer, LayerSource};
pub use loader::{DEFAULT_PARENT_KEY, LoaderOptions, YamlLoader, load_yaml};
pub use merge::{
    MappingStrategy, MergePolicy, SequenceStrategy, merge_layer_into, merge_layers, merge_values,
};

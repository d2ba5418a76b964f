//! Hierarchical YAML configuration
//!
//! Loads a configuration from a chain of YAML files, where each file can name
//! parent files through a reserved key (`base` by default). The files are
//! merged into one tree, optionally overridden by environment variables, and
//! validated either against a declarative [`schema::Schema`] or by
//! deserializing into a typed serde model ([`verify::load_and_verify`]).
//!
//! ```no_run
//! use std::path::Path;
//! use yamlconf::{LoaderOptions, YamlLoader};
//!
//! let loader = YamlLoader::new(LoaderOptions::new().with_env_prefix("APP"));
//! let config = loader.load(Path::new("config/prod.yaml"))?;
//! println!("{}", config["server"]["port"]);
//! # Ok::<(), yamlconf::ConfigError>(())
//! ```

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod format;
pub mod keypath;
pub mod logging;
pub mod paths;
pub mod schema;
pub mod verify;

pub use config::{Hierarchy, Layer, LayerSource, LoaderOptions, MergePolicy, YamlLoader};
pub use error::{ConfigError, ErrorCode, Result, ValidationError, ValidationErrors};
pub use keypath::KeyPath;
pub use schema::{Field, FieldKind, Schema, Validated, load_validated};
pub use verify::{load_and_verify, verify_files_exist};

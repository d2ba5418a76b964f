//! Error types for loading, merging and validating configuration.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Severe configuration problems.
///
/// Every variant describes a configuration that cannot be used. Validation
/// failures against a schema are grouped in [`ConfigError::Validation`] so
/// that callers can inspect each field-level problem.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file {} does not exist!", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Non-finite number at '{key}' in {}: NaN and infinity cannot be represented", path.display())]
    NonFiniteNumber { path: PathBuf, key: String },

    #[error("Unsupported root node type in {}: expected a mapping, found {found}", path.display())]
    InvalidRoot { path: PathBuf, found: &'static str },

    #[error("Unsupported value for {key} in {}: {found}", path.display())]
    InvalidParent {
        path: PathBuf,
        key: String,
        found: String,
    },

    #[error("Value of relative path key {key} in {} is not a string: {found}", path.display())]
    InvalidPathValue {
        path: PathBuf,
        key: String,
        found: String,
    },

    #[error("Unsupported types for merge at '{path}': {existing} and {incoming}")]
    MergeConflict {
        path: String,
        existing: &'static str,
        incoming: &'static str,
    },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("Config does not match model {model}: {message}")]
    Model { model: String, message: String },

    #[error("The path {path} is not contained in the model {model}!")]
    MissingKey { path: String, model: String },

    #[error("The file {} referenced by {key} does not exist!", file.display())]
    MissingFile { key: String, file: PathBuf },

    #[error("Config watcher error: {0}")]
    Watch(#[from] notify::Error),
}

/// Human readable name of a tree node's kind, used in error messages.
pub fn kind_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Error codes for programmatic handling of validation failures.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingField,
    InvalidType,
    InvalidChoice,
    OutOfRange,
    UnknownField,
    /// The schema itself cannot be checked, e.g. a non-finite bound.
    InvalidSchema,
}

/// A single field-addressable validation failure.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationError {
    /// Dotted key path of the offending node (`""` for the root).
    pub path: String,
    pub code: ErrorCode,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code,
            message: message.into(),
        }
    }

    // Convenience constructors

    pub fn missing_field(path: &str) -> Self {
        Self::new(path, ErrorCode::MissingField, format!("{} is required", path))
    }

    pub fn invalid_type(path: &str, expected: &str, found: &serde_json::Value) -> Self {
        Self::new(
            path,
            ErrorCode::InvalidType,
            format!("expected {}, found {}", expected, kind_name(found)),
        )
    }

    pub fn invalid_choice(path: &str, found: &serde_json::Value, choices: &[serde_json::Value]) -> Self {
        let allowed: Vec<String> = choices.iter().map(|c| c.to_string()).collect();
        Self::new(
            path,
            ErrorCode::InvalidChoice,
            format!("{} is not one of [{}]", found, allowed.join(", ")),
        )
    }

    pub fn out_of_range(path: &str, found: f64, min: Option<f64>, max: Option<f64>) -> Self {
        let bound = match (min, max) {
            (Some(lo), Some(hi)) => format!("[{}, {}]", lo, hi),
            (Some(lo), None) => format!(">= {}", lo),
            (None, Some(hi)) => format!("<= {}", hi),
            (None, None) => "unbounded".to_string(),
        };
        Self::new(
            path,
            ErrorCode::OutOfRange,
            format!("{} is out of range {}", found, bound),
        )
    }

    pub fn unknown_field(path: &str) -> Self {
        Self::new(path, ErrorCode::UnknownField, format!("unknown field {}", path))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// All validation failures found in one pass over a configuration tree.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Find the first error reported for the given dotted path.
    pub fn for_path(&self, path: &str) -> Option<&ValidationError> {
        self.errors.iter().find(|e| e.path == path)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

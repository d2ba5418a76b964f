//! Check subcommand
//!
//! Validates a hierarchy against a schema file.

use super::LoadArgs;
use crate::config::YamlLoader;
use crate::format::{format_validated, format_validation_errors};
use crate::schema::Schema;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the check subcommand
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Entry configuration file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Schema document (YAML)
    #[arg(short, long, value_name = "SCHEMA")]
    pub schema: PathBuf,

    #[command(flatten)]
    pub load: LoadArgs,
}

/// Result of a check: the report to print and whether validation passed.
#[derive(Debug)]
pub struct CheckReport {
    pub output: String,
    pub valid: bool,
}

impl CheckArgs {
    /// Load the hierarchy and validate it.
    ///
    /// Load failures are errors; validation failures are reported in the
    /// returned [`CheckReport`].
    pub fn run(&self) -> Result<CheckReport> {
        let schema = Schema::from_yaml_file(&self.schema)
            .with_context(|| format!("Failed to read schema {}", self.schema.display()))?;
        let merged = YamlLoader::new(self.load.to_options())
            .load(&self.file)
            .with_context(|| format!("Failed to load {}", self.file.display()))?;

        Ok(match schema.validate(&merged) {
            Ok(validated) => CheckReport {
                output: format_validated(&validated),
                valid: true,
            },
            Err(errors) => CheckReport {
                output: format_validation_errors(&errors),
                valid: false,
            },
        })
    }
}

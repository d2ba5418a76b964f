//! Diff subcommand for yamlconf
//!
//! Compares the merged configurations of two hierarchies.

use super::LoadArgs;
use crate::config::YamlLoader;
use crate::diff::diff_values;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the diff subcommand
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Old entry configuration file
    #[arg(value_name = "OLD")]
    pub old: PathBuf,

    /// New entry configuration file
    #[arg(value_name = "NEW")]
    pub new: PathBuf,

    #[command(flatten)]
    pub load: LoadArgs,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    pub format: DiffFormat,
}

/// Output format for diff results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for DiffFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(DiffFormat::Text),
            "json" => Ok(DiffFormat::Json),
            _ => Err(format!("Invalid format '{}'. Valid options: text, json", s)),
        }
    }
}

impl std::fmt::Display for DiffFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffFormat::Text => write!(f, "text"),
            DiffFormat::Json => write!(f, "json"),
        }
    }
}

impl DiffArgs {
    /// Load both hierarchies with the same options and render their diff.
    pub fn run(&self) -> Result<String> {
        let loader = YamlLoader::new(self.load.to_options());
        let old = loader
            .load(&self.old)
            .with_context(|| format!("Failed to load {}", self.old.display()))?;
        let new = loader
            .load(&self.new)
            .with_context(|| format!("Failed to load {}", self.new.display()))?;

        let diff = diff_values(&old, &new);
        Ok(match self.format {
            DiffFormat::Text => format!(
                "Diff: {} -> {}\n{}\n{}",
                self.old.display(),
                self.new.display(),
                "=".repeat(60),
                diff
            ),
            DiffFormat::Json => {
                let mut out = serde_json::to_string_pretty(&diff)?;
                out.push('\n');
                out
            }
        })
    }
}

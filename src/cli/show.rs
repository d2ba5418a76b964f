//! Show and layers subcommands
//!
//! Print the merged configuration or the files that make up a hierarchy.

use super::LoadArgs;
use crate::config::YamlLoader;
use crate::format::{OutputFormat, format_layers, render};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the show subcommand
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Entry configuration file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub load: LoadArgs,

    /// Output format: yaml (default) or json
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

impl ShowArgs {
    /// Load the hierarchy and render the merged configuration.
    pub fn run(&self) -> Result<String> {
        let merged = YamlLoader::new(self.load.to_options())
            .load(&self.file)
            .with_context(|| format!("Failed to load {}", self.file.display()))?;
        render(&merged, self.format)
    }
}

/// Arguments for the layers subcommand
#[derive(Args, Debug)]
pub struct LayersArgs {
    /// Entry configuration file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub load: LoadArgs,
}

impl LayersArgs {
    /// Load the hierarchy and list its layers, highest precedence first.
    pub fn run(&self) -> Result<String> {
        let hierarchy = YamlLoader::new(self.load.to_options())
            .load_hierarchy(&self.file)
            .with_context(|| format!("Failed to load {}", self.file.display()))?;
        Ok(format_layers(&hierarchy))
    }
}

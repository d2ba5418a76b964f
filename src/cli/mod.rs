//! CLI command definitions for yamlconf
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod check;
pub mod diff;
pub mod show;

use crate::config::{LoaderOptions, MappingStrategy, MergePolicy, SequenceStrategy};
use crate::keypath::KeyPath;
use crate::logging::LogTarget;
use check::CheckArgs;
use clap::{Args, Parser, Subcommand};
use diff::DiffArgs;
use show::{LayersArgs, ShowArgs};

/// Hierarchical YAML configuration tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: LogTarget,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the merged configuration of a hierarchy
    Show(ShowArgs),

    /// List the files of a hierarchy in precedence order
    Layers(LayersArgs),

    /// Validate a hierarchy against a schema file
    Check(CheckArgs),

    /// Compare the merged configurations of two hierarchies
    Diff(DiffArgs),
}

/// Options shared by every command that loads a hierarchy
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Key used to reference parent files
    #[arg(long, default_value = crate::config::DEFAULT_PARENT_KEY, value_name = "KEY")]
    pub parent_key: String,

    /// Dotted key path whose value is a path relative to its file (repeatable)
    #[arg(long = "relative-path", value_name = "KEYPATH")]
    pub relative_paths: Vec<KeyPath>,

    /// Apply environment overrides `<PREFIX>__A__B`
    #[arg(long, value_name = "PREFIX")]
    pub env_prefix: Option<String>,

    /// How mappings from different files are merged
    #[arg(long, value_enum, default_value_t = MappingStrategy::Deep)]
    pub mappings: MappingStrategy,

    /// How sequences from different files are merged
    #[arg(long, value_enum, default_value_t = SequenceStrategy::Append)]
    pub sequences: SequenceStrategy,
}

impl LoadArgs {
    /// Build loader options from the command line.
    pub fn to_options(&self) -> LoaderOptions {
        let mut options = LoaderOptions::new()
            .with_parent_key(self.parent_key.clone())
            .with_relative_path_keys(self.relative_paths.iter().cloned())
            .with_merge_policy(MergePolicy::new(self.mappings, self.sequences));
        if let Some(prefix) = &self.env_prefix {
            options = options.with_env_prefix(prefix.clone());
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::path::PathBuf;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_show_with_options() {
        let cli = Cli::try_parse_from([
            "yamlconf",
            "--verbose",
            "show",
            "app.yaml",
            "--parent-key",
            "extends",
            "--relative-path",
            "data.file",
            "--relative-path",
            "model.weights",
            "--env-prefix",
            "APP",
            "--sequences",
            "replace",
            "--format",
            "json",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.log, LogTarget::Stderr);
        let Command::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.file, PathBuf::from("app.yaml"));

        let options = args.load.to_options();
        assert_eq!(options.parent_key, "extends");
        assert_eq!(options.relative_path_keys.len(), 2);
        assert_eq!(options.relative_path_keys[1].to_string(), "model.weights");
        assert_eq!(options.env_prefix.as_deref(), Some("APP"));
        assert_eq!(options.merge.sequences, SequenceStrategy::Replace);
        assert_eq!(options.merge.mappings, MappingStrategy::Deep);
    }

    #[test]
    fn test_parse_log_target() {
        let cli = Cli::try_parse_from(["yamlconf", "--log", "off", "layers", "app.yaml"]).unwrap();
        assert_eq!(cli.log, LogTarget::Off);
    }

    #[test]
    fn test_rejects_bad_key_path() {
        let result = Cli::try_parse_from(["yamlconf", "show", "app.yaml", "--relative-path", "a..b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_check_and_diff() {
        let cli =
            Cli::try_parse_from(["yamlconf", "check", "app.yaml", "--schema", "schema.yaml"]).unwrap();
        assert!(matches!(cli.command, Command::Check(ref a) if a.schema == PathBuf::from("schema.yaml")));

        let cli = Cli::try_parse_from(["yamlconf", "diff", "a.yaml", "b.yaml", "-f", "json"]).unwrap();
        let Command::Diff(args) = cli.command else {
            panic!("expected diff");
        };
        assert_eq!(args.format, diff::DiffFormat::Json);
    }
}

//! yamlconf command line tool
//!
//! Loads hierarchical YAML configurations and prints, validates or compares
//! them.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use yamlconf::cli::{Cli, Command};
use yamlconf::logging::init_logging;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log, cli.verbose)?;

    match cli.command {
        Command::Show(args) => print!("{}", args.run()?),
        Command::Layers(args) => print!("{}", args.run()?),
        Command::Diff(args) => print!("{}", args.run()?),
        Command::Check(args) => {
            let report = args.run()?;
            print!("{}", report.output);
            if !report.valid {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

//! Integration tests for the command line subcommands.

use clap::Parser;
use serde_json::Value;
use std::path::{Path, PathBuf};
use yamlconf::cli::{Cli, Command};

fn fixture(relative: &str) -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data/yaml")
        .join(relative)
        .to_string_lossy()
        .into_owned()
}

fn parse(args: &[&str]) -> Command {
    let mut argv = vec!["yamlconf"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap().command
}

#[test]
fn test_show_json() {
    let prod = fixture("hierarchy/prod.yaml");
    let Command::Show(args) = parse(&["show", &prod, "--format", "json"]) else {
        panic!("expected show");
    };

    let output: Value = serde_json::from_str(&args.run().unwrap()).unwrap();
    assert_eq!(output["server"]["port"], 443);
    assert_eq!(output["plugins"].as_array().unwrap().len(), 2);
}

#[test]
fn test_show_yaml_with_relative_path() {
    let prod = fixture("hierarchy/prod.yaml");
    let Command::Show(args) = parse(&["show", &prod, "--relative-path", "data.file"]) else {
        panic!("expected show");
    };

    let output: Value = serde_yaml::from_str(&args.run().unwrap()).unwrap();
    assert_eq!(
        PathBuf::from(output["data"]["file"].as_str().unwrap()),
        PathBuf::from(fixture("hierarchy/data/input.txt"))
    );
}

#[test]
fn test_show_missing_file_fails() {
    let missing = fixture("missing.yaml");
    let Command::Show(args) = parse(&["show", &missing]) else {
        panic!("expected show");
    };

    let err = args.run().unwrap_err();
    assert!(format!("{:#}", err).contains("does not exist"));
}

#[test]
fn test_layers() {
    let prod = fixture("hierarchy/prod.yaml");
    let Command::Layers(args) = parse(&["layers", &prod]) else {
        panic!("expected layers");
    };

    let output = args.run().unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("prod.yaml"));
    assert!(lines[1].contains("common.yaml"));
}

#[test]
fn test_check_valid_and_invalid() {
    let schema = fixture("hierarchy/schema.yaml");

    let prod = fixture("hierarchy/prod.yaml");
    let Command::Check(args) = parse(&["check", &prod, "--schema", &schema]) else {
        panic!("expected check");
    };
    let report = args.run().unwrap();
    assert!(report.valid);
    assert_eq!(report.output, "Configuration is valid.\n");

    // simple.yaml has none of the schema's keys and its root rejects unknown ones.
    let simple = fixture("simple.yaml");
    let Command::Check(args) = parse(&["check", &simple, "--schema", &schema]) else {
        panic!("expected check");
    };
    let report = args.run().unwrap();
    assert!(!report.valid);
    assert!(report.output.contains("error: server: server is required [MISSING_FIELD]"));
    assert!(report.output.contains("[UNKNOWN_FIELD]"));
}

#[test]
fn test_diff_text_and_json() {
    let common = fixture("hierarchy/common.yaml");
    let prod = fixture("hierarchy/prod.yaml");

    let Command::Diff(args) = parse(&["diff", &common, &prod]) else {
        panic!("expected diff");
    };
    let text = args.run().unwrap();
    assert!(text.contains("~ server.port: 8080 -> 443"));
    assert!(text.contains("~ logging.level: \"info\" -> \"warn\""));

    let Command::Diff(args) = parse(&["diff", &common, &prod, "--format", "json"]) else {
        panic!("expected diff");
    };
    let json: Value = serde_json::from_str(&args.run().unwrap()).unwrap();
    assert!(json["added"].as_array().unwrap().is_empty());
    assert!(json["removed"].as_array().unwrap().is_empty());
    assert_eq!(json["changed"].as_array().unwrap().len(), 5);
}

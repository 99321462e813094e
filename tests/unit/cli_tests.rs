//! Unit tests for CLI argument parsing and validation

use clap::Parser;
use keydiff::cli::{Cli, Commands, OutputFormat};
use keydiff::SortStrategy;
use std::path::PathBuf;

#[test]
fn test_cli_diff_command() {
    let cli = Cli::try_parse_from(["keydiff", "diff", "old.csv", "new.csv", "--key", "id"]).unwrap();
    match cli.command {
        Commands::Diff {
            pair,
            detail,
            format,
            output,
        } => {
            assert_eq!(pair.left, PathBuf::from("old.csv"));
            assert_eq!(pair.right, PathBuf::from("new.csv"));
            assert_eq!(pair.key, "id");
            assert!(pair.right_key.is_none());
            assert!(pair.strategy.is_none());
            assert!(!detail);
            assert_eq!(format, OutputFormat::Pretty);
            assert!(output.is_none());
        }
        _ => panic!("Expected Diff command"),
    }
    assert!(!cli.verbose);
    assert!(!cli.quiet);
}

#[test]
fn test_cli_diff_command_with_options() {
    let cli = Cli::try_parse_from([
        "keydiff",
        "diff",
        "old.csv",
        "new.parquet",
        "--key",
        "id,region",
        "--right-key",
        "uid,area",
        "--detail",
        "--sort-left",
        "--strategy",
        "store",
        "--rename-right",
        "person=name",
        "--delimiter",
        ";",
        "--format",
        "json",
        "--output",
        "out.json",
    ])
    .unwrap();

    match cli.command {
        Commands::Diff {
            pair,
            detail,
            format,
            output,
        } => {
            assert_eq!(pair.key, "id,region");
            assert_eq!(pair.right_key.as_deref(), Some("uid,area"));
            assert!(pair.sort_left);
            assert!(!pair.sort_right);
            assert_eq!(pair.strategy, Some(SortStrategy::Store));
            assert_eq!(pair.rename_right.as_deref(), Some("person=name"));
            assert_eq!(pair.delimiter, Some(';'));
            assert!(detail);
            assert_eq!(format, OutputFormat::Json);
            assert_eq!(output, Some(PathBuf::from("out.json")));
        }
        _ => panic!("Expected Diff command"),
    }
}

#[test]
fn test_cli_events_command() {
    let cli = Cli::try_parse_from([
        "keydiff", "events", "a.csv", "b.csv", "-k", "id", "--redact", "-o", "events.jsonl.zst",
    ])
    .unwrap();
    match cli.command {
        Commands::Events {
            pair,
            redact,
            output,
        } => {
            assert_eq!(pair.key, "id");
            assert!(redact);
            assert_eq!(output, Some(PathBuf::from("events.jsonl.zst")));
        }
        _ => panic!("Expected Events command"),
    }
}

#[test]
fn test_cli_snapshot_command() {
    let cli = Cli::try_parse_from([
        "keydiff", "snapshot", "data.tsv", "--key", "id", "--sort", "--strategy", "memory",
    ])
    .unwrap();
    match cli.command {
        Commands::Snapshot {
            input,
            key,
            sort,
            strategy,
            rename,
            delimiter,
            output,
            ..
        } => {
            assert_eq!(input, PathBuf::from("data.tsv"));
            assert_eq!(key, "id");
            assert!(sort);
            assert_eq!(strategy, Some(SortStrategy::Memory));
            assert!(rename.is_none());
            assert!(delimiter.is_none());
            assert!(output.is_none());
        }
        _ => panic!("Expected Snapshot command"),
    }
}

#[test]
fn test_cli_global_flags() {
    let cli = Cli::try_parse_from([
        "keydiff", "snapshot", "data.csv", "--key", "id", "--verbose", "--quiet", "--config",
        "settings.json",
    ])
    .unwrap();
    assert!(cli.verbose);
    assert!(cli.quiet);
    assert_eq!(cli.config, Some(PathBuf::from("settings.json")));
}

#[test]
fn test_cli_rejects_invalid_values() {
    assert!(Cli::try_parse_from(["keydiff", "diff", "a.csv", "b.csv"]).is_err());
    assert!(Cli::try_parse_from([
        "keydiff", "diff", "a.csv", "b.csv", "--key", "id", "--strategy", "quick"
    ])
    .is_err());
    assert!(Cli::try_parse_from([
        "keydiff", "diff", "a.csv", "b.csv", "--key", "id", "--format", "xml"
    ])
    .is_err());
    assert!(Cli::try_parse_from([
        "keydiff", "diff", "a.csv", "b.csv", "--key", "id", "--delimiter", "::"
    ])
    .is_err());
}

#[test]
fn test_output_format_parse() {
    assert_eq!(OutputFormat::parse("pretty"), Ok(OutputFormat::Pretty));
    assert_eq!(OutputFormat::parse("json"), Ok(OutputFormat::Json));
    assert!(OutputFormat::parse("yaml").is_err());
}

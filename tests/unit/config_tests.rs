//! Unit tests for settings and source descriptions

use crate::common::TestFixture;
use keydiff::config::{parse_key_list, parse_renames};
use keydiff::{Settings, SortStrategy, SourceKind, SourceSpec};
use std::path::Path;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.page_size, keydiff::DEFAULT_PAGE_SIZE);
    assert_eq!(settings.sort_strategy, SortStrategy::Memory);
    assert!(settings.memory_limit.is_none());
    assert!(settings.csv_delimiter.is_none());
    assert!(settings.validate().is_ok());
}

#[test]
fn test_load_explicit_settings_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_raw(
            "settings.json",
            r#"{"page_size": 250, "memory_limit": "2GB", "csv_delimiter": "|"}"#,
        )
        .unwrap();

    let settings = Settings::from_file(&path).unwrap();
    assert_eq!(settings.page_size, 250);
    assert_eq!(settings.memory_limit.as_deref(), Some("2GB"));
    assert_eq!(settings.csv_delimiter, Some('|'));
    assert_eq!(settings.sort_strategy, SortStrategy::Memory);
}

#[test]
fn test_zero_page_size_is_rejected() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_raw("settings.json", r#"{"page_size": 0}"#).unwrap();
    let err = Settings::load(Some(&path)).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_missing_settings_file() {
    let err = Settings::from_file(Path::new("/nonexistent/keydiff.json")).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_source_spec_detects_kind() {
    let spec = SourceSpec::new("data/people.parquet", vec!["id".to_string()]).unwrap();
    assert_eq!(spec.kind, SourceKind::Container);
    assert_eq!(spec.sort, SortStrategy::None);
    assert!(spec.renames.is_empty());

    let spec = SourceSpec::new("query.sql", vec!["id".to_string()]).unwrap();
    assert_eq!(spec.kind, SourceKind::Relational);

    assert!(SourceSpec::new("notes.md", vec!["id".to_string()])
        .unwrap_err()
        .is_config());
}

#[test]
fn test_database_table_spec() {
    let spec = SourceSpec::database_table(
        "main.orders",
        Some("shop.duckdb".to_string()),
        vec!["id".to_string()],
    );
    assert_eq!(spec.kind, SourceKind::DatabaseTable);
    assert_eq!(spec.database.as_deref(), Some("shop.duckdb"));
    assert_eq!(spec.path.to_str(), Some("main.orders"));
}

#[test]
fn test_settings_delimiter_applies_to_text_sources() {
    let settings = Settings {
        csv_delimiter: Some('|'),
        ..Settings::default()
    };
    let spec = SourceSpec::new("a.csv", vec!["id".to_string()]).unwrap();
    assert_eq!(spec.text_delimiter(&settings), '|');
}

#[test]
fn test_key_and_rename_parsing() {
    assert_eq!(parse_key_list("a,b"), vec!["a", "b"]);
    assert!(parse_key_list("").is_empty());

    let renames = parse_renames("old_id=id,old_name=name").unwrap();
    assert_eq!(renames.apply("old_id"), "id");
    assert_eq!(renames.apply("old_name"), "name");

    let err = parse_renames("broken").unwrap_err();
    assert!(err.is_config());
}

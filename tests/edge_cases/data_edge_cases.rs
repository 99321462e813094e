//! Edge case tests for data-related scenarios

use crate::common::{sample_data, CliTestRunner, TestFixture};
use keydiff::{diff, diff_events, open_table, MemoryTable, Settings, SourceSpec};
use serde_json::json;

#[test]
fn test_csv_with_inconsistent_columns() {
    let runner = CliTestRunner::new().unwrap();
    let left = runner
        .fixture()
        .create_raw("bad.csv", "id,name,price\n1,Product A,19.99\n2,Product B,29.99,Extra Column\n")
        .unwrap();
    let right = runner
        .fixture()
        .create_csv("ok.csv", &[vec!["id", "name", "price"], vec!["1", "Product A", "19.99"]])
        .unwrap();

    let error = runner.expect_failure(&[
        "diff",
        left.to_str().unwrap(),
        right.to_str().unwrap(),
        "--key",
        "id",
    ]);
    assert!(!error.is_config(), "{}", error);
    assert!(
        matches!(error, keydiff::KeydiffError::MalformedRow { .. }),
        "{}",
        error
    );
}

#[test]
fn test_missing_key_column() {
    let runner = CliTestRunner::new().unwrap();
    let left = runner
        .fixture()
        .create_csv("left.csv", &sample_data::people_left())
        .unwrap();
    let right = runner
        .fixture()
        .create_csv("right.csv", &sample_data::people_right())
        .unwrap();

    let error = runner.expect_failure(&[
        "diff",
        left.to_str().unwrap(),
        right.to_str().unwrap(),
        "--key",
        "uid",
    ]);
    assert!(error.is_config());
    assert!(error.to_string().contains("uid"));
}

#[test]
fn test_mismatched_key_lengths() {
    let runner = CliTestRunner::new().unwrap();
    let left = runner
        .fixture()
        .create_csv("left.csv", &sample_data::people_left())
        .unwrap();
    let right = runner
        .fixture()
        .create_csv("right.csv", &sample_data::people_right())
        .unwrap();

    let error = runner.expect_failure(&[
        "diff",
        left.to_str().unwrap(),
        right.to_str().unwrap(),
        "--key",
        "id",
        "--right-key",
        "id,name",
    ]);
    assert!(error.is_config());
    assert!(error.to_string().contains("different lengths"));
}

#[test]
fn test_empty_key_list() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_csv("a.csv", &sample_data::people_left()).unwrap();
    let spec = SourceSpec::new(&path, Vec::new()).unwrap();
    let err = open_table(&spec, &Settings::default()).err().unwrap();
    assert!(err.is_config());
}

#[test]
fn test_header_only_files() {
    let fixture = TestFixture::new().unwrap();
    let left = fixture.create_raw("left.csv", "id,name\n").unwrap();
    let right = fixture
        .create_csv("right.csv", &[vec!["id", "name"], vec!["1", "Ann"]])
        .unwrap();

    let settings = Settings::default();
    let mut l = open_table(&SourceSpec::new(&left, vec!["id".into()]).unwrap(), &settings).unwrap();
    let mut r = open_table(&SourceSpec::new(&right, vec!["id".into()]).unwrap(), &settings).unwrap();

    let summary = diff(&mut l, &mut r, false).unwrap();
    assert_eq!(summary.rows_added, 1);
    assert_eq!(summary.rows_deleted, 0);
    assert_eq!(summary.total_rows, 1);
}

#[test]
fn test_unicode_values() {
    let fixture = TestFixture::new().unwrap();
    let left = fixture
        .create_csv("left.csv", &[vec!["id", "name"], vec!["1", "Café"], vec!["2", "北京"]])
        .unwrap();
    let right = fixture
        .create_csv("right.csv", &[vec!["id", "name"], vec!["1", "Cafe"], vec!["2", "北京"]])
        .unwrap();

    let settings = Settings::default();
    let mut l = open_table(&SourceSpec::new(&left, vec!["id".into()]).unwrap(), &settings).unwrap();
    let mut r = open_table(&SourceSpec::new(&right, vec!["id".into()]).unwrap(), &settings).unwrap();

    let summary = diff(&mut l, &mut r, true).unwrap();
    assert_eq!(summary.rows_changed, 1);
    assert_eq!(summary.row_diffs[0].changes["name"].old, json!("Café"));
}

#[test]
fn test_duplicate_keys_pair_up_in_order() {
    let mut left = MemoryTable::from_text(
        &["id", "v"],
        &[vec!["1", "a"], vec!["1", "b"], vec!["2", "c"]],
        &["id"],
    )
    .unwrap();
    let mut right = MemoryTable::from_text(
        &["id", "v"],
        &[vec!["1", "a"], vec!["1", "x"], vec!["2", "c"]],
        &["id"],
    )
    .unwrap();

    let summary = diff(&mut left, &mut right, true).unwrap();
    assert_eq!(summary.rows_changed, 1);
    assert_eq!(summary.row_diffs[0].changes["v"].new, json!("x"));
}

#[test]
fn test_duplicate_column_after_rename() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_csv("a.csv", &[vec!["id", "a", "b"], vec!["1", "x", "y"]])
        .unwrap();
    let spec = SourceSpec::new(&path, vec!["id".into()])
        .unwrap()
        .with_renames(keydiff::Renames::parse("a=b").unwrap());
    let err = open_table(&spec, &Settings::default()).err().unwrap();
    assert!(err.is_config());
}

#[test]
fn test_empty_left_table_with_memory_tables() {
    let mut left = MemoryTable::from_text(&["id"], &[], &["id"]).unwrap();
    let mut right = MemoryTable::from_text(&["id"], &[vec!["1"], vec!["2"]], &["id"]).unwrap();
    let mut events = Vec::new();
    diff_events(&mut left, &mut right, &mut events).unwrap();
    let offsets: Vec<_> = events.iter().filter_map(|e| e.offset()).collect();
    assert_eq!(offsets, vec![1, 2]);
}

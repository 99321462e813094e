//! Integration tests for the snapshot command

use crate::common::{sample_data, CliTestRunner, TestFixture};
use keydiff::output::read_events;
use keydiff::{open_table, snapshot, Change, Settings, SortStrategy, SourceSpec};
use serde_json::json;

#[test]
fn test_snapshot_emits_one_event_per_row() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_csv("people.csv", &sample_data::people_right()).unwrap();

    let spec = SourceSpec::new(&path, vec!["id".to_string()]).unwrap();
    let mut table = open_table(&spec, &Settings::default()).unwrap();
    let mut events = Vec::new();
    snapshot(&mut table, &mut events).unwrap();

    assert_eq!(events.len(), 3);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.offset(), Some(i as u64 + 1));
        match &event.change {
            Change::RowStored { key, data, .. } => {
                assert_eq!(key.len(), 1);
                assert_eq!(data.len(), 5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn test_cli_snapshot_sorted_output() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner
        .fixture()
        .create_csv("people.csv", &sample_data::people_right_unsorted())
        .unwrap();
    let output = runner.fixture().path("people.jsonl.zst");

    runner.expect_success(&[
        "snapshot",
        path.to_str().unwrap(),
        "--key",
        "id",
        "--sort",
        "--output",
        output.to_str().unwrap(),
    ]);

    let events = read_events(&output).unwrap();
    let keys: Vec<_> = events
        .iter()
        .map(|e| match &e.change {
            Change::RowStored { key, .. } => key["id"].clone(),
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(keys, vec![json!("1"), json!("3"), json!("4")]);
}

#[test]
fn test_snapshot_keeps_input_order_without_sort() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_csv("people.csv", &sample_data::people_right_unsorted())
        .unwrap();

    let spec = SourceSpec::new(&path, vec!["id".to_string()])
        .unwrap()
        .with_sort(SortStrategy::None);
    let mut table = open_table(&spec, &Settings::default()).unwrap();
    let mut events = Vec::new();
    snapshot(&mut table, &mut events).unwrap();

    let first = match &events[0].change {
        Change::RowStored { data, .. } => data["name"].clone(),
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(first, json!("Neal"));
}

#[test]
fn test_snapshot_renamed_key() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner
        .fixture()
        .create_csv("people.csv", &[vec!["person_id", "name"], vec!["7", "Ann"]])
        .unwrap();
    let output = runner.fixture().path("people.jsonl");

    runner.expect_success(&[
        "snapshot",
        path.to_str().unwrap(),
        "--key",
        "person_id",
        "--rename",
        "person_id=id",
        "--output",
        output.to_str().unwrap(),
    ]);

    let events = read_events(&output).unwrap();
    match &events[0].change {
        Change::RowStored { key, .. } => assert_eq!(key["id"], json!("7")),
        other => panic!("unexpected {:?}", other),
    }
}

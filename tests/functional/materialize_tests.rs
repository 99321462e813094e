//! Functional tests for ordering unsorted sources

use crate::common::{sample_data, TestFixture};
use keydiff::{diff, open_table, Settings, SortStrategy, SourceSpec, Table};

fn spec(path: &std::path::Path, sort: SortStrategy) -> SourceSpec {
    SourceSpec::new(path, vec!["id".to_string()])
        .unwrap()
        .with_sort(sort)
}

fn ids(table: &mut dyn Table) -> Vec<String> {
    let mut out = Vec::new();
    while table.advance().unwrap() {
        let row = table.row().unwrap();
        out.push(String::from_utf8(row.bytes("id").unwrap().to_vec()).unwrap());
    }
    out
}

#[test]
fn test_unsorted_right_side_with_both_strategies() {
    let fixture = TestFixture::new().unwrap();
    let left = fixture.create_csv("left.csv", &sample_data::people_left()).unwrap();
    let right = fixture
        .create_csv("right.csv", &sample_data::people_right_unsorted())
        .unwrap();
    let settings = Settings::default();

    for strategy in [SortStrategy::Memory, SortStrategy::Store] {
        let mut l = open_table(&spec(&left, SortStrategy::None), &settings).unwrap();
        let mut r = open_table(&spec(&right, strategy), &settings).unwrap();
        let summary = diff(&mut l, &mut r, false).unwrap();

        assert_eq!(summary.columns_added, vec!["city"], "{:?}", strategy);
        assert_eq!(summary.rows_added, 1, "{:?}", strategy);
        assert_eq!(summary.rows_deleted, 1, "{:?}", strategy);
        assert_eq!(summary.rows_changed, 2, "{:?}", strategy);
        assert_eq!(summary.total_rows, 4, "{:?}", strategy);
    }
}

#[test]
fn test_strategies_agree_on_order() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_csv(
            "scrambled.csv",
            &[
                vec!["id", "v"],
                vec!["b", "1"],
                vec!["10", "2"],
                vec!["a", "3"],
                vec!["", "4"],
                vec!["9", "5"],
                vec!["A", "6"],
            ],
        )
        .unwrap();
    let settings = Settings {
        page_size: 2,
        ..Settings::default()
    };

    let mut memory = open_table(&spec(&path, SortStrategy::Memory), &settings).unwrap();
    let mut store = open_table(&spec(&path, SortStrategy::Store), &settings).unwrap();

    let expected = vec!["", "10", "9", "A", "a", "b"];
    assert_eq!(ids(memory.as_mut()), expected);
    assert_eq!(ids(store.as_mut()), expected);
}

#[test]
fn test_store_pages_through_large_input() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_large_csv("large.csv", 2_500).unwrap();
    let settings = Settings {
        page_size: 100,
        ..Settings::default()
    };

    let mut table = open_table(&spec(&path, SortStrategy::Store), &settings).unwrap();
    let ids = ids(table.as_mut());
    assert_eq!(ids.len(), 2_500);
    assert_eq!(ids.first().map(String::as_str), Some("00000000"));
    assert_eq!(ids.last().map(String::as_str), Some("00002499"));
    assert!(ids.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_sorted_source_diffs_against_itself() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_csv("right.csv", &sample_data::people_right_unsorted())
        .unwrap();
    let settings = Settings::default();

    let mut a = open_table(&spec(&path, SortStrategy::Memory), &settings).unwrap();
    let mut b = open_table(&spec(&path, SortStrategy::Store), &settings).unwrap();
    assert!(diff(&mut a, &mut b, false).unwrap().is_empty());
}

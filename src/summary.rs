//! Folding the event stream into a single diff summary

use crate::diff::diff_events;
use crate::error::Result;
use crate::event::{Change, Changes, Event, EventSink};
use crate::table::{Record, Table};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Column type change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeChange {
    pub old: String,
    pub new: String,
}

/// Changed cells of a row, identified by its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowDiff {
    pub key: Record,
    pub changes: Changes,
}

/// Aggregate result of diffing two tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDiff {
    pub total_rows: u64,
    pub columns_added: Vec<String>,
    pub columns_dropped: Vec<String>,
    pub type_changes: IndexMap<String, TypeChange>,
    pub rows_added: u64,
    pub rows_deleted: u64,
    pub rows_changed: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub row_diffs: Vec<RowDiff>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_rows: Vec<Record>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted_rows: Vec<Record>,
}

impl TableDiff {
    /// True when neither schema nor rows differ.
    pub fn is_empty(&self) -> bool {
        self.columns_added.is_empty()
            && self.columns_dropped.is_empty()
            && self.type_changes.is_empty()
            && self.rows_added == 0
            && self.rows_deleted == 0
            && self.rows_changed == 0
    }
}

/// Sink that accumulates events into a [`TableDiff`].
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    diff: TableDiff,
    detail: bool,
}

impl SummaryBuilder {
    /// `detail` keeps added rows, deleted keys and per-row changes in addition
    /// to the counts.
    pub fn new(detail: bool) -> Self {
        Self {
            diff: TableDiff::default(),
            detail,
        }
    }

    /// Close the run and log its totals.
    pub fn finish(self) -> TableDiff {
        let summary = self.diff;
        log::info!(
            "diff complete: {} rows visited, {} added, {} deleted, {} changed",
            summary.total_rows,
            summary.rows_added,
            summary.rows_deleted,
            summary.rows_changed
        );
        summary
    }
}

impl EventSink for SummaryBuilder {
    fn emit(&mut self, event: Event) -> Result<()> {
        if let Some(offset) = event.offset() {
            self.diff.total_rows = offset;
        }

        match event.change {
            Change::ColumnAdded { column } => self.diff.columns_added.push(column),
            Change::ColumnRemoved { column } => self.diff.columns_dropped.push(column),
            Change::ColumnChanged {
                column,
                old_type,
                new_type,
            } => {
                self.diff.type_changes.insert(
                    column,
                    TypeChange {
                        old: old_type,
                        new: new_type,
                    },
                );
            }
            Change::RowAdded { data, .. } => {
                self.diff.rows_added += 1;
                if self.detail {
                    self.diff.new_rows.push(data);
                }
            }
            Change::RowRemoved { key, .. } => {
                self.diff.rows_deleted += 1;
                if self.detail {
                    self.diff.deleted_rows.push(key);
                }
            }
            Change::RowChanged { key, changes, .. } => {
                self.diff.rows_changed += 1;
                if self.detail {
                    self.diff.row_diffs.push(RowDiff { key, changes });
                }
            }
            Change::RowStored { .. } => {}
        }

        Ok(())
    }
}

/// Diff two key-ordered tables into a summary. With `detail`, the summary
/// also carries the added rows, deleted keys and cell-level changes.
pub fn diff<L, R>(left: &mut L, right: &mut R, detail: bool) -> Result<TableDiff>
where
    L: Table + ?Sized,
    R: Table + ?Sized,
{
    let mut builder = SummaryBuilder::new(detail);
    diff_events(left, right, &mut builder)?;
    let summary = builder.finish();

    Ok(summary)
}

//! # keydiff
//!
//! Streaming diff of two key-ordered tables. Sources are read through a
//! forward-only [`Table`] cursor; a merge-join walks both sides in lockstep
//! and reports schema and row changes as [`Event`]s or as a [`TableDiff`]
//! summary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod diff;
pub mod error;
pub mod event;
pub mod materialize;
pub mod output;
pub mod progress;
pub mod source;
pub mod summary;
pub mod table;

pub use config::{Settings, SortStrategy, SourceKind, SourceSpec};
pub use diff::{diff_events, snapshot};
pub use error::{KeydiffError, Result};
pub use event::{Change, Event, EventSink, Redacted};
pub use materialize::{IndexedTable, SortedTable};
pub use source::{open_table, CsvTable, ParquetTable, SqlQuery, SqlTable};
pub use summary::{diff, SummaryBuilder, TableDiff};
pub use table::{Cell, Columns, MemoryTable, Record, Renames, Row, Schema, Table};

/// Default number of rows fetched per DuckDB page
pub const DEFAULT_PAGE_SIZE: usize = 10000;

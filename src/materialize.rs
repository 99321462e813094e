//! Bringing unsorted sources into key order
//!
//! Two strategies share one contract: drain the source once, then yield its
//! rows in non-decreasing key order with the source's key and columns. Rows
//! with equal keys keep their source order.

use crate::config::{Settings, SortStrategy};
use crate::diff::compare_keys;
use crate::error::Result;
use crate::source::duck::{self, PagedScan, ScanTable};
use crate::table::{Columns, MemoryTable, Row, Schema, Table};
use duckdb::types::Value as DuckValue;
use tempfile::TempDir;

/// Apply `strategy` to `table`.
pub fn order(
    table: Box<dyn Table>,
    strategy: SortStrategy,
    settings: &Settings,
) -> Result<Box<dyn Table>> {
    match strategy {
        SortStrategy::None => Ok(table),
        SortStrategy::Memory => Ok(Box::new(SortedTable::new(table)?)),
        SortStrategy::Store => Ok(Box::new(IndexedTable::new(table, settings)?)),
    }
}

fn key_bytes(row: &Row, key: &[String]) -> Vec<Vec<u8>> {
    key.iter()
        .map(|k| row.bytes(k).map(<[u8]>::to_vec).unwrap_or_default())
        .collect()
}

/// Buffers every row in memory and sorts by key.
pub struct SortedTable {
    inner: MemoryTable,
}

impl SortedTable {
    pub fn new<T: Table>(mut source: T) -> Result<Self> {
        let schema = Schema::of(&source);

        let mut keyed = Vec::new();
        while source.advance()? {
            if let Some(row) = source.row() {
                keyed.push((key_bytes(row, schema.key()), row.clone()));
            }
        }
        // Stable, so ties keep their input order.
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b));

        log::debug!("sorted {} rows in memory", keyed.len());

        let rows = keyed.into_iter().map(|(_, row)| row).collect();
        Ok(Self {
            inner: MemoryTable::new(schema, rows),
        })
    }
}

impl Table for SortedTable {
    fn key(&self) -> &[String] {
        self.inner.key()
    }

    fn columns(&self) -> &Columns {
        self.inner.columns()
    }

    fn row(&self) -> Option<&Row> {
        self.inner.row()
    }

    fn advance(&mut self) -> Result<bool> {
        self.inner.advance()
    }
}

/// Spills rows into a temporary DuckDB database and scans them back in key
/// order, for sources too large to sort in memory.
///
/// Each column `i` is stored as `b{i}` (canonical bytes) and `v{i}` (the
/// reporting value as JSON). Rows are copied into a table ordered by the key
/// bytes and the load sequence, then read back page by page.
pub struct IndexedTable {
    inner: ScanTable,
}

impl IndexedTable {
    pub fn new<T: Table>(mut source: T, settings: &Settings) -> Result<Self> {
        let schema = Schema::of(&source);
        let width = schema.columns().len();

        let scratch = TempDir::new()?;
        let connection = duck::open_file_connection(&scratch.path().join("store.duckdb"), settings)?;

        let definition = (0..width)
            .map(|i| format!("b{i} BLOB, v{i} VARCHAR"))
            .collect::<Vec<_>>()
            .join(", ");
        connection.execute_batch(&format!("CREATE TABLE staging (seq BIGINT, {})", definition))?;

        let mut loaded: i64 = 0;
        {
            let mut appender = connection.appender("staging")?;
            while source.advance()? {
                let Some(row) = source.row() else { break };
                let mut values = Vec::with_capacity(1 + 2 * width);
                values.push(DuckValue::BigInt(loaded));
                for cell in row.cells() {
                    values.push(DuckValue::Blob(cell.bytes().to_vec()));
                    values.push(DuckValue::Text(serde_json::to_string(cell.value())?));
                }
                appender.append_row(duckdb::appender_params_from_iter(&values))?;
                loaded += 1;
            }
            appender.flush()?;
        }

        let mut order_terms: Vec<String> = schema
            .key()
            .iter()
            .filter_map(|k| schema.columns().get_index_of(k))
            .map(|i| format!("b{i}"))
            .collect();
        order_terms.push("seq".to_string());

        connection.execute_batch(&format!(
            "CREATE TABLE ordered AS SELECT * FROM staging ORDER BY {}; DROP TABLE staging;",
            order_terms.join(", ")
        ))?;

        log::debug!("indexed {} rows in {}", loaded, scratch.path().display());

        let scan = PagedScan::stored(connection, "ordered", width, settings.page_size, scratch);
        Ok(Self {
            inner: ScanTable::new(schema, scan),
        })
    }
}

impl Table for IndexedTable {
    fn key(&self) -> &[String] {
        self.inner.key()
    }

    fn columns(&self) -> &Columns {
        self.inner.columns()
    }

    fn row(&self) -> Option<&Row> {
        self.inner.row()
    }

    fn advance(&mut self) -> Result<bool> {
        self.inner.advance()
    }
}

//! Paged DuckDB scans shared by the DuckDB-backed sources and the indexed store
//!
//! A DuckDB result set borrows its statement and connection, so it cannot be
//! held open between `advance` calls. Sources therefore land their rows in a
//! table whose `rowid` follows the required order, and a [`PagedScan`] reads it
//! back one page at a time with keyset pagination on `rowid`.

use crate::config::Settings;
use crate::error::{KeydiffError, Result};
use crate::table::{Cell, Columns, Row, Schema, Table};
use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection;
use serde_json::{Number, Value};
use std::collections::VecDeque;
use std::path::Path;
use tempfile::TempDir;

/// Open an in-memory connection tuned for ordered scans.
pub fn open_connection(settings: &Settings) -> Result<Connection> {
    let connection = Connection::open_in_memory()?;
    configure(&connection, settings)?;
    Ok(connection)
}

/// Open a file-backed connection, used when rows must spill to disk.
pub fn open_file_connection(path: &Path, settings: &Settings) -> Result<Connection> {
    let connection = Connection::open(path)?;
    configure(&connection, settings)?;
    Ok(connection)
}

fn configure(connection: &Connection, settings: &Settings) -> Result<()> {
    if let Some(limit) = &settings.memory_limit {
        connection.execute_batch(&format!("SET memory_limit={}", quote_literal(limit)))?;
    }
    connection.execute_batch("SET enable_progress_bar=false")?;
    // Scans rely on rowid following the load order.
    connection.execute_batch("SET preserve_insertion_order=true")?;
    Ok(())
}

/// Quote an identifier for DuckDB SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for DuckDB SQL.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Column names and type labels of a table or view, in declared order.
pub fn describe(connection: &Connection, relation: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = connection.prepare(&format!("DESCRIBE {}", relation))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push((row.get::<_, String>(0)?, row.get::<_, String>(1)?));
    }
    Ok(columns)
}

/// `ORDER BY` terms that sort rows by the text rendering of the key columns,
/// which matches the byte-wise ordering of the cells built by [`PagedScan`].
pub fn key_order_terms(key: &[String]) -> String {
    key.iter()
        .map(|k| format!("CAST({} AS VARCHAR) NULLS FIRST", quote_ident(k)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Translate DuckDB errors raised while reading user input.
pub fn convert_error(error: duckdb::Error, source: &str) -> KeydiffError {
    let message = error.to_string();

    if message.contains("Expected Number of Columns")
        || message.contains("too many columns")
        || message.contains("Unterminated quoted field")
    {
        KeydiffError::malformed_row(format!("{}: {}", source, message))
    } else if message.contains("No files found") || message.contains("does not exist") {
        KeydiffError::invalid_input(format!("File not found: {}", source))
    } else if message.contains("Permission denied") {
        KeydiffError::invalid_input(format!("Permission denied accessing: {}", source))
    } else if message.contains("CSV Error") || message.contains("Invalid CSV") {
        KeydiffError::invalid_input(format!("Malformed CSV file '{}': {}", source, message))
    } else if message.contains("UTF-8") || message.contains("encoding") {
        KeydiffError::invalid_input(format!("File encoding error '{}': {}", source, message))
    } else {
        KeydiffError::DuckDb(error)
    }
}

/// Decode a DuckDB value for reporting.
pub fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::from(i),
        ValueRef::SmallInt(i) => Value::from(i),
        ValueRef::Int(i) => Value::from(i),
        ValueRef::BigInt(i) => Value::from(i),
        ValueRef::HugeInt(i) => match i64::try_from(i) {
            Ok(small) => Value::from(small),
            Err(_) => Value::String(i.to_string()),
        },
        ValueRef::UTinyInt(i) => Value::from(i),
        ValueRef::USmallInt(i) => Value::from(i),
        ValueRef::UInt(i) => Value::from(i),
        ValueRef::UBigInt(i) => Value::from(i),
        ValueRef::Float(f) => float_value(f64::from(f)),
        ValueRef::Double(f) => float_value(f),
        ValueRef::Decimal(d) => Value::String(d.to_string()),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<blob:{} bytes>", b.len())),
        ValueRef::Date32(days) => NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        ValueRef::Time64(unit, t) => {
            let micros = unit.to_micros(t);
            NaiveTime::from_num_seconds_from_midnight_opt(
                (micros / 1_000_000) as u32,
                ((micros % 1_000_000) * 1_000) as u32,
            )
            .map(|t| Value::String(t.format("%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null)
        }
        ValueRef::Timestamp(unit, ts) => timestamp_value(unit, ts),
        other => Value::String(format!("{:?}", duckdb::types::Value::from(other))),
    }
}

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS: i32 = 719_163;

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn timestamp_value(unit: TimeUnit, ts: i64) -> Value {
    DateTime::from_timestamp_micros(unit.to_micros(ts))
        .map(|dt| Value::String(dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string()))
        .unwrap_or(Value::Null)
}

/// How the columns of a scanned table map onto cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    /// Source columns: value decoded from the native type, bytes from
    /// `CAST(col AS VARCHAR)`.
    Native,
    /// Store columns: a BLOB of canonical bytes followed by the JSON value.
    Stored,
}

/// Reads a table back page by page in `rowid` order.
pub struct PagedScan {
    connection: Connection,
    sql: String,
    encoding: Encoding,
    width: usize,
    page_size: usize,
    last_rowid: i64,
    buffer: VecDeque<Vec<Cell>>,
    exhausted: bool,
    label: String,
    // Dropped after the connection so the database file is closed first.
    _scratch: Option<TempDir>,
}

impl PagedScan {
    /// Scan source columns of `table`, decoding native DuckDB values.
    pub fn native(
        connection: Connection,
        table: &str,
        columns: &[String],
        page_size: usize,
        label: impl Into<String>,
    ) -> Self {
        let select = columns
            .iter()
            .map(|c| {
                let col = quote_ident(c);
                format!("{col}, CAST({col} AS VARCHAR)")
            })
            .collect::<Vec<_>>();
        Self::build(connection, table, select, Encoding::Native, columns.len(), page_size, label, None)
    }

    /// Scan a store table laid out as `b0, v0, b1, v1, ...`.
    pub fn stored(
        connection: Connection,
        table: &str,
        width: usize,
        page_size: usize,
        scratch: TempDir,
    ) -> Self {
        let select = (0..width)
            .map(|i| format!("b{i}, v{i}"))
            .collect::<Vec<_>>();
        Self::build(
            connection,
            table,
            select,
            Encoding::Stored,
            width,
            page_size,
            "indexed store",
            Some(scratch),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        connection: Connection,
        table: &str,
        select: Vec<String>,
        encoding: Encoding,
        width: usize,
        page_size: usize,
        label: impl Into<String>,
        scratch: Option<TempDir>,
    ) -> Self {
        let mut projection = vec!["rowid".to_string()];
        projection.extend(select);
        let sql = format!(
            "SELECT {} FROM {} WHERE rowid > ? ORDER BY rowid LIMIT ?",
            projection.join(", "),
            table
        );
        Self {
            connection,
            sql,
            encoding,
            width,
            page_size,
            last_rowid: -1,
            buffer: VecDeque::new(),
            exhausted: false,
            label: label.into(),
            _scratch: scratch,
        }
    }

    /// Next row's cells, fetching a new page when the buffer runs dry.
    pub fn next_cells(&mut self) -> Result<Option<Vec<Cell>>> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_page()?;
        }
        Ok(self.buffer.pop_front())
    }

    fn fetch_page(&mut self) -> Result<()> {
        let mut stmt = self.connection.prepare(&self.sql)?;
        let mut rows = stmt.query(duckdb::params![self.last_rowid, self.page_size as i64])?;

        let mut fetched = 0;
        while let Some(row) = rows.next()? {
            self.last_rowid = row.get(0)?;
            let mut cells = Vec::with_capacity(self.width);
            for i in 0..self.width {
                let first = 1 + 2 * i;
                let cell = match self.encoding {
                    Encoding::Native => {
                        let text: Option<String> = row.get(first + 1)?;
                        Cell::new(
                            text.map(String::into_bytes).unwrap_or_default(),
                            json_value(row.get_ref(first)?),
                        )
                    }
                    Encoding::Stored => {
                        let bytes: Vec<u8> = row.get(first)?;
                        let json: String = row.get(first + 1)?;
                        Cell::new(bytes, serde_json::from_str(&json)?)
                    }
                };
                cells.push(cell);
            }
            self.buffer.push_back(cells);
            fetched += 1;
        }

        if fetched < self.page_size {
            self.exhausted = true;
        }
        log::debug!("{}: fetched page of {} rows", self.label, fetched);
        Ok(())
    }
}

/// A [`Table`] backed by a [`PagedScan`].
pub struct ScanTable {
    schema: Schema,
    scan: PagedScan,
    current: Option<Row>,
    blank_nulls: bool,
}

impl ScanTable {
    pub fn new(schema: Schema, scan: PagedScan) -> Self {
        Self {
            schema,
            scan,
            current: None,
            blank_nulls: false,
        }
    }

    /// Report missing values as empty strings, as delimited text has no NULL.
    pub fn with_blank_nulls(mut self) -> Self {
        self.blank_nulls = true;
        self
    }
}

impl Table for ScanTable {
    fn key(&self) -> &[String] {
        self.schema.key()
    }

    fn columns(&self) -> &Columns {
        self.schema.columns()
    }

    fn row(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    fn advance(&mut self) -> Result<bool> {
        self.current = match self.scan.next_cells()? {
            Some(mut cells) => {
                if self.blank_nulls {
                    for cell in cells.iter_mut().filter(|c| c.value().is_null()) {
                        *cell = Cell::text("");
                    }
                }
                Some(Row::new(self.schema.layout(), cells)?)
            }
            None => None,
        };
        Ok(self.current.is_some())
    }
}

//! Row cursor contract shared by every source
//!
//! A [`Table`] is a forward-only cursor over rows. The diff engine pulls rows
//! with [`Table::advance`] and reads the current row with [`Table::row`]. Each
//! cell carries two forms of the same value: canonical bytes, used for
//! ordering and equality, and a decoded scalar used only for reporting.

use crate::error::{KeydiffError, Result};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column name to type label, in declared column order.
pub type Columns = IndexMap<String, String>;

/// Decoded values keyed by column name, in declared column order.
pub type Record = IndexMap<String, Value>;

/// A pull-based cursor over key-ordered rows.
pub trait Table {
    /// Ordered names of the key columns.
    fn key(&self) -> &[String];

    /// Column name to type label mapping.
    fn columns(&self) -> &Columns;

    /// The current row. `None` before the first successful `advance` and
    /// after exhaustion.
    fn row(&self) -> Option<&Row>;

    /// Step to the next row. Returns `Ok(false)` once the source is exhausted.
    fn advance(&mut self) -> Result<bool>;
}

impl<T: Table + ?Sized> Table for Box<T> {
    fn key(&self) -> &[String] {
        (**self).key()
    }

    fn columns(&self) -> &Columns {
        (**self).columns()
    }

    fn row(&self) -> Option<&Row> {
        (**self).row()
    }

    fn advance(&mut self) -> Result<bool> {
        (**self).advance()
    }
}

/// One column value in both of its forms.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    bytes: Vec<u8>,
    value: Value,
}

impl Cell {
    pub fn new(bytes: Vec<u8>, value: Value) -> Self {
        Self { bytes, value }
    }

    /// A text cell: the bytes are the UTF-8 text and the value is the string.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            bytes: text.as_bytes().to_vec(),
            value: Value::String(text),
        }
    }

    /// A missing value. Compares equal to an empty string.
    pub fn null() -> Self {
        Self {
            bytes: Vec::new(),
            value: Value::Null,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// A row positioned against its table's column layout.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Columns>,
    cells: Vec<Cell>,
}

impl Row {
    /// Build a row. The cell count must match the column count.
    pub fn new(columns: Arc<Columns>, cells: Vec<Cell>) -> Result<Self> {
        if cells.len() != columns.len() {
            return Err(KeydiffError::malformed_row(format!(
                "expected {} columns, got {}",
                columns.len(),
                cells.len()
            )));
        }
        Ok(Self { columns, cells })
    }

    /// Canonical bytes for `col`, or `None` if the column is unknown.
    pub fn bytes(&self, col: &str) -> Option<&[u8]> {
        self.columns
            .get_index_of(col)
            .map(|i| self.cells[i].bytes())
    }

    /// Decoded value for `col`; `Null` if the column is unknown.
    pub fn value(&self, col: &str) -> Value {
        self.columns
            .get_index_of(col)
            .map(|i| self.cells[i].value().clone())
            .unwrap_or(Value::Null)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Decoded values of the given columns.
    pub fn record_of<'a>(&self, cols: impl IntoIterator<Item = &'a String>) -> Record {
        cols.into_iter()
            .map(|c| (c.clone(), self.value(c)))
            .collect()
    }

    /// Decoded values of every column.
    pub fn record(&self) -> Record {
        self.columns
            .keys()
            .zip(&self.cells)
            .map(|(name, cell)| (name.clone(), cell.value().clone()))
            .collect()
    }
}

/// Column rename mapping applied to a source before diffing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Renames(HashMap<String, String>);

impl Renames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.0.insert(from.into(), to.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse `old=new` pairs separated by commas.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut renames = Self::new();
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
                    renames.insert(from.trim(), to.trim());
                }
                _ => {
                    return Err(KeydiffError::config(format!(
                        "invalid rename '{}', expected old=new",
                        pair
                    )))
                }
            }
        }
        Ok(renames)
    }

    pub fn apply(&self, name: &str) -> String {
        self.0
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

impl FromIterator<(String, String)> for Renames {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Column layout and key of a source, after renames.
#[derive(Debug, Clone)]
pub struct Schema {
    key: Vec<String>,
    columns: Arc<Columns>,
}

impl Schema {
    /// Build a schema from source column names and type labels. Renames apply
    /// to both the key and the column names; the key is validated against the
    /// renamed columns.
    pub fn new(
        columns: impl IntoIterator<Item = (String, String)>,
        key: &[String],
        renames: &Renames,
    ) -> Result<Self> {
        let mut renamed = Columns::new();
        for (name, ty) in columns {
            let name = renames.apply(&name);
            if renamed.insert(name.clone(), ty).is_some() {
                return Err(KeydiffError::config(format!(
                    "duplicate column `{}`",
                    name
                )));
            }
        }

        let key: Vec<String> = key.iter().map(|k| renames.apply(k)).collect();
        validate_key(&key, &renamed)?;

        Ok(Self {
            key,
            columns: Arc::new(renamed),
        })
    }

    /// Schema of an already opened table.
    pub fn of<T: Table + ?Sized>(table: &T) -> Self {
        Self {
            key: table.key().to_vec(),
            columns: Arc::new(table.columns().clone()),
        }
    }

    pub fn key(&self) -> &[String] {
        &self.key
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    /// Shared handle to the column layout, for building rows.
    pub fn layout(&self) -> Arc<Columns> {
        Arc::clone(&self.columns)
    }
}

/// Check that a key is non-empty and names existing columns.
pub fn validate_key(key: &[String], columns: &Columns) -> Result<()> {
    if key.is_empty() {
        return Err(KeydiffError::config("a key must be provided"));
    }
    for k in key {
        if !columns.contains_key(k) {
            return Err(KeydiffError::config(format!(
                "table does not have key column `{}`",
                k
            )));
        }
    }
    Ok(())
}

/// A cursor over rows already held in memory.
///
/// Useful for fixtures and for callers that assemble rows themselves. Rows are
/// yielded in the order given; the caller is responsible for key order.
#[derive(Debug)]
pub struct MemoryTable {
    schema: Schema,
    rows: std::vec::IntoIter<Row>,
    current: Option<Row>,
}

impl MemoryTable {
    /// Build a table of text cells. Every column is typed `string`.
    pub fn from_text(header: &[&str], rows: &[Vec<&str>], key: &[&str]) -> Result<Self> {
        let key: Vec<String> = key.iter().map(|k| k.to_string()).collect();
        let schema = Schema::new(
            header.iter().map(|h| (h.to_string(), "string".to_string())),
            &key,
            &Renames::new(),
        )?;
        let layout = schema.layout();
        let rows = rows
            .iter()
            .map(|r| Row::new(Arc::clone(&layout), r.iter().map(|v| Cell::text(*v)).collect()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(schema, rows))
    }

    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self {
            schema,
            rows: rows.into_iter(),
            current: None,
        }
    }
}

impl Table for MemoryTable {
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
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }
}

//! Delimited text source

use super::duck::{self, PagedScan, ScanTable};
use crate::config::Settings;
use crate::error::{KeydiffError, Result};
use crate::table::{Columns, Renames, Row, Schema, Table};
use std::path::Path;

/// Delimited text file read through DuckDB's CSV reader.
///
/// The header row names the columns and every column is typed `VARCHAR`.
/// Rows come back in file order; a row with the wrong number of fields fails
/// the open.
pub struct CsvTable {
    inner: ScanTable,
}

impl CsvTable {
    pub fn open(
        path: &Path,
        key: &[String],
        renames: &Renames,
        delimiter: char,
        settings: &Settings,
    ) -> Result<Self> {
        let source = path.display().to_string();
        let names = read_header(path, delimiter, &source)?;
        let schema = Schema::new(
            names.iter().map(|name| (name.clone(), "VARCHAR".to_string())),
            key,
            renames,
        )?;

        // Sniffing is off so the header line, not the widest row, fixes the
        // column count.
        let column_types = names
            .iter()
            .map(|name| format!("{}: 'VARCHAR'", duck::quote_literal(name)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "CREATE TEMP TABLE src AS SELECT * FROM read_csv({}, header=true, auto_detect=false, \
             delim={}, quote='\"', escape='\"', columns={{{}}})",
            duck::quote_literal(&path.to_string_lossy()),
            duck::quote_literal(&delimiter.to_string()),
            column_types
        );

        let connection = duck::open_connection(settings)?;
        connection
            .execute_batch(&sql)
            .map_err(|e| duck::convert_error(e, &source))?;

        log::debug!("opened text source {} with {} columns", source, names.len());

        let scan = PagedScan::native(connection, "src", &names, settings.page_size, source);
        Ok(Self {
            inner: ScanTable::new(schema, scan).with_blank_nulls(),
        })
    }
}

/// Column names from the first line of a delimited file.
fn read_header(path: &Path, delimiter: char, source: &str) -> Result<Vec<String>> {
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            KeydiffError::config(format!("Delimiter '{}' is not a single ASCII byte", delimiter))
        })?;

    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| KeydiffError::invalid_input(format!("Cannot open '{}': {}", source, e)))?;
    let headers = reader.headers().map_err(|e| {
        KeydiffError::invalid_input(format!("Cannot read header of '{}': {}", source, e))
    })?;

    let names: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if i == 0 {
                name.trim_start_matches('\u{feff}').to_string()
            } else {
                name.to_string()
            }
        })
        .collect();

    if names.iter().all(String::is_empty) {
        return Err(KeydiffError::invalid_input(format!(
            "'{}' has no header row",
            source
        )));
    }
    Ok(names)
}

impl Table for CsvTable {
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

//! Parquet record container source

use crate::error::{KeydiffError, Result};
use crate::table::{Cell, Columns, Renames, Row, Schema, Table};
use parquet::basic::ConvertedType;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::reader::RowIter;
use parquet::record::Field;
use serde_json::{Number, Value};
use std::fs::File;
use std::path::Path;

/// Rows of a flat Parquet file, in file order.
///
/// The schema must be a root group of primitive fields. Cell bytes are the
/// text rendering of each value, so a file meant to be diffed without sorting
/// must be ordered by that rendering.
pub struct ParquetTable {
    schema: Schema,
    rows: RowIter<'static>,
    current: Option<Row>,
}

impl ParquetTable {
    pub fn open(path: &Path, key: &[String], renames: &Renames) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            KeydiffError::invalid_input(format!("Cannot open '{}': {}", path.display(), e))
        })?;
        let reader = SerializedFileReader::new(file).map_err(|e| {
            KeydiffError::structural(format!(
                "cannot read container schema of '{}': {}",
                path.display(),
                e
            ))
        })?;

        let columns = flat_columns(&reader)?;
        let schema = Schema::new(columns, key, renames)?;

        log::debug!(
            "opened container {} with {} rows",
            path.display(),
            reader.metadata().file_metadata().num_rows()
        );

        Ok(Self {
            schema,
            rows: reader.into_iter(),
            current: None,
        })
    }
}

fn flat_columns(reader: &SerializedFileReader<File>) -> Result<Vec<(String, String)>> {
    let root = reader.metadata().file_metadata().schema();
    if !root.is_group() {
        return Err(KeydiffError::structural("container root is not a record"));
    }

    let mut columns = Vec::new();
    for field in root.get_fields() {
        if field.is_group() {
            return Err(KeydiffError::structural(format!(
                "nested field `{}` is not supported",
                field.name()
            )));
        }
        let converted = field.get_basic_info().converted_type();
        let label = if converted != ConvertedType::NONE {
            format!("{:?}", converted)
        } else {
            format!("{:?}", field.get_physical_type())
        };
        columns.push((field.name().to_string(), label));
    }
    Ok(columns)
}

fn field_cell(field: &Field) -> Cell {
    match field {
        Field::Null => Cell::null(),
        Field::Str(s) => Cell::text(s.as_str()),
        Field::Bytes(b) => Cell::new(
            b.data().to_vec(),
            Value::String(format!("<blob:{} bytes>", b.len())),
        ),
        other => Cell::new(other.to_string().into_bytes(), field_value(other)),
    }
}

fn field_value(field: &Field) -> Value {
    match field {
        Field::Bool(b) => Value::Bool(*b),
        Field::Byte(i) => Value::from(*i),
        Field::Short(i) => Value::from(*i),
        Field::Int(i) => Value::from(*i),
        Field::Long(i) => Value::from(*i),
        Field::UByte(i) => Value::from(*i),
        Field::UShort(i) => Value::from(*i),
        Field::UInt(i) => Value::from(*i),
        Field::ULong(i) => Value::from(*i),
        Field::Float(f) => Number::from_f64(f64::from(*f))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Field::Double(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}

impl Table for ParquetTable {
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
        self.current = match self.rows.next() {
            Some(record) => {
                let record = record?;
                let cells = record
                    .get_column_iter()
                    .map(|(_, field)| field_cell(field))
                    .collect();
                Some(Row::new(self.schema.layout(), cells)?)
            }
            None => None,
        };
        Ok(self.current.is_some())
    }
}

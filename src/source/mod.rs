//! Source adapters producing [`Table`] cursors

pub mod csv;
pub mod duck;
pub mod parquet;
pub mod sql;

pub use self::csv::CsvTable;
pub use self::parquet::ParquetTable;
pub use self::sql::{SqlQuery, SqlTable};

use crate::config::{Settings, SourceKind, SourceSpec};
use crate::error::Result;
use crate::materialize;
use crate::table::Table;

/// Open the source described by `spec`, bringing it into key order when it
/// is flagged as unsorted.
pub fn open_table(spec: &SourceSpec, settings: &Settings) -> Result<Box<dyn Table>> {
    log::debug!("opening {:?} source {}", spec.kind, spec.path.display());

    let table: Box<dyn Table> = match spec.kind {
        SourceKind::Text => Box::new(CsvTable::open(
            &spec.path,
            &spec.key,
            &spec.renames,
            spec.text_delimiter(settings),
            settings,
        )?),
        SourceKind::Relational => Box::new(SqlTable::open(
            &SqlQuery::from_file(&spec.path)?,
            &spec.key,
            &spec.renames,
            settings,
        )?),
        SourceKind::Container => {
            Box::new(ParquetTable::open(&spec.path, &spec.key, &spec.renames)?)
        }
        SourceKind::DatabaseTable => Box::new(SqlTable::open(
            &SqlQuery::from_table(spec.database.as_deref(), &spec.path.to_string_lossy())?,
            &spec.key,
            &spec.renames,
            settings,
        )?),
    };

    materialize::order(table, spec.sort, settings)
}

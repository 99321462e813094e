//! Relational query source
//!
//! A `.sql` file holds a SELECT query, optionally preceded by setup statements
//! and a `-- ATTACH ...` comment naming an external database. Placeholders such
//! as `{DB_PASSWORD}` in the ATTACH line are filled from the environment.

use super::duck::{self, PagedScan, ScanTable};
use crate::config::Settings;
use crate::error::{KeydiffError, Result};
use crate::table::{Columns, Renames, Row, Schema, Table};
use std::env;
use std::fs;
use std::path::Path;

/// A query plus what must run before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlQuery {
    /// Full `ATTACH ...` statement, if the query reads an external database.
    pub attach: Option<String>,
    /// Lines run as one batch before the query, such as `USE db;`.
    pub setup: Vec<String>,
    pub query: String,
    /// Where the query came from, for messages.
    pub origin: String,
}

impl SqlQuery {
    /// Parse a `.sql` file.
    pub fn from_file(file_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(file_path).map_err(|e| {
            KeydiffError::invalid_input(format!(
                "Failed to read SQL file '{}': {}",
                file_path.display(),
                e
            ))
        })?;
        Self::parse(&content, &file_path.display().to_string())
    }

    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let mut attach = None;
        let mut setup_lines = Vec::new();
        let mut query_lines = Vec::new();
        let mut in_select_query = false;

        for line in content.lines() {
            let trimmed = line.trim();

            let comment = trimmed
                .strip_prefix("--")
                .or_else(|| trimmed.strip_prefix("//"))
                .map(str::trim);

            if let Some(comment) = comment {
                if comment.to_uppercase().starts_with("ATTACH") {
                    attach = Some(substitute_env_vars(comment)?);
                }
            } else if !trimmed.is_empty() {
                if trimmed.to_uppercase().starts_with("SELECT")
                    || trimmed.to_uppercase().starts_with("WITH")
                {
                    in_select_query = true;
                }
                if in_select_query {
                    query_lines.push(line);
                } else {
                    setup_lines.push(trimmed.to_string());
                }
            }
        }

        if query_lines.is_empty() {
            return Err(KeydiffError::invalid_input(format!(
                "No SELECT query found in '{}'",
                origin
            )));
        }

        let query = query_lines
            .join("\n")
            .trim()
            .trim_end_matches(';')
            .trim()
            .to_string();

        Ok(Self {
            attach,
            setup: setup_lines,
            query,
            origin: origin.to_string(),
        })
    }

    /// Select every column of `relation` (`table`, `schema.table` or
    /// `catalog.schema.table`).
    ///
    /// `database` is either a full `ATTACH ...` statement or the path of a
    /// DuckDB file, which is attached read-only and made the default catalog.
    /// `{VAR}` placeholders in it are filled from the environment.
    pub fn from_table(database: Option<&str>, relation: &str) -> Result<Self> {
        let parts: Vec<&str> = relation.split('.').map(str::trim).collect();
        if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(KeydiffError::config(format!(
                "Invalid table name '{}': expected [schema.]table",
                relation
            )));
        }
        let quoted = parts
            .iter()
            .map(|p| duck::quote_ident(p))
            .collect::<Vec<_>>()
            .join(".");

        let (attach, setup) = match database.map(str::trim) {
            None => (None, Vec::new()),
            Some(db) if db.to_uppercase().starts_with("ATTACH") => {
                (Some(substitute_env_vars(db)?), Vec::new())
            }
            Some(db) => (
                Some(format!(
                    "ATTACH {} AS {} (READ_ONLY)",
                    duck::quote_literal(&substitute_env_vars(db)?),
                    SOURCE_CATALOG
                )),
                vec![format!("USE {};", SOURCE_CATALOG)],
            ),
        };

        Ok(Self {
            attach,
            setup,
            query: format!("SELECT * FROM {}", quoted),
            origin: relation.to_string(),
        })
    }
}

/// Catalog name for a database attached by file path.
const SOURCE_CATALOG: &str = "source_db";

/// Replace `{VAR}` placeholders with environment variable values.
pub fn substitute_env_vars(text: &str) -> Result<String> {
    substitute_with(text, |name| env::var(name).ok())
}

fn substitute_with<F>(text: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = text.to_string();

    let mut start = 0;
    while let Some(open_pos) = result[start..].find('{') {
        let open_pos = start + open_pos;
        if let Some(close_pos) = result[open_pos..].find('}') {
            let close_pos = open_pos + close_pos;
            let var_name = &result[open_pos + 1..close_pos];

            let var_value = lookup(var_name).ok_or_else(|| {
                KeydiffError::invalid_input(format!(
                    "Environment variable '{}' not found",
                    var_name
                ))
            })?;

            result.replace_range(open_pos..=close_pos, &var_value);
            start = open_pos + var_value.len();
        } else {
            start = open_pos + 1;
        }
    }

    Ok(result)
}

/// Rows of a query, ordered by the text rendering of the key columns.
pub struct SqlTable {
    inner: ScanTable,
}

impl SqlTable {
    /// Run `query` and snapshot its result in key order. `key` names columns as
    /// the query returns them; `renames` apply afterwards.
    pub fn open(
        query: &SqlQuery,
        key: &[String],
        renames: &Renames,
        settings: &Settings,
    ) -> Result<Self> {
        let connection = duck::open_connection(settings)?;

        if let Some(attach) = &query.attach {
            log::debug!("attaching external database for {}", query.origin);
            connection.execute_batch(attach)?;
        }
        if !query.setup.is_empty() {
            connection.execute_batch(&query.setup.join("\n"))?;
        }

        let relation = format!("({}) AS q", query.query);
        let described = duck::describe(&connection, &format!("SELECT * FROM {}", relation))?;
        let names: Vec<String> = described.iter().map(|(name, _)| name.clone()).collect();

        let schema = Schema::new(described, key, renames)?;

        connection.execute_batch(&format!(
            "CREATE TEMP TABLE src AS SELECT * FROM {} ORDER BY {}",
            relation,
            duck::key_order_terms(key)
        ))?;

        log::debug!(
            "opened query source {} with {} columns",
            query.origin,
            names.len()
        );

        let scan = PagedScan::native(
            connection,
            "src",
            &names,
            settings.page_size,
            query.origin.clone(),
        );
        Ok(Self {
            inner: ScanTable::new(schema, scan),
        })
    }
}

impl Table for SqlTable {
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

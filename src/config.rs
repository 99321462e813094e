//! Run settings and source descriptions

use crate::error::{KeydiffError, Result};
use crate::table::Renames;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the settings file picked up from the working directory.
pub const SETTINGS_FILE: &str = "keydiff.json";

/// How an unordered source is brought into key order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortStrategy {
    /// The source is already key-ordered.
    #[default]
    None,
    /// Buffer every row and sort in memory.
    Memory,
    /// Load into a temporary DuckDB store and scan back in key order.
    Store,
}

impl SortStrategy {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "memory" => Ok(Self::Memory),
            "store" => Ok(Self::Store),
            _ => Err(format!(
                "Invalid sort strategy: {}. Use 'none', 'memory' or 'store'",
                s
            )),
        }
    }
}

/// Tunables shared by every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rows fetched from DuckDB per page.
    pub page_size: usize,
    /// DuckDB memory limit, e.g. "4GB".
    pub memory_limit: Option<String>,
    /// Strategy used when a side is flagged as unsorted.
    pub sort_strategy: SortStrategy,
    /// Delimiter for text sources; inferred from the extension when unset.
    pub csv_delimiter: Option<char>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: crate::DEFAULT_PAGE_SIZE,
            memory_limit: None,
            sort_strategy: SortStrategy::Memory,
            csv_delimiter: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from `keydiff.json` in the working
    /// directory when present, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(SETTINGS_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(|name| std::env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            KeydiffError::config(format!(
                "Failed to read settings file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let settings: Self = serde_json::from_str(&content)?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply `KEYDIFF_PAGE_SIZE` and `KEYDIFF_MEMORY_LIMIT`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(size) = lookup("KEYDIFF_PAGE_SIZE") {
            self.page_size = size.trim().parse().map_err(|_| {
                KeydiffError::config(format!("Invalid KEYDIFF_PAGE_SIZE: '{}'", size))
            })?;
        }
        if let Some(limit) = lookup("KEYDIFF_MEMORY_LIMIT") {
            self.memory_limit = Some(limit);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(KeydiffError::config("page_size must be greater than 0"));
        }
        Ok(())
    }
}

/// Kind of source, detected from the input path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Delimited text (`.csv`, `.tsv`, `.txt`).
    Text,
    /// A `.sql` file holding a query and an optional ATTACH line.
    Relational,
    /// A Parquet record file.
    Container,
    /// A table inside an attached database.
    DatabaseTable,
}

impl SourceKind {
    pub fn detect(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(Self::Text),
            "sql" => Ok(Self::Relational),
            "parquet" | "pq" => Ok(Self::Container),
            _ => Err(KeydiffError::config(format!(
                "Unsupported source '{}': expected .csv, .tsv, .sql or .parquet",
                path.display()
            ))),
        }
    }
}

/// Everything needed to open one side of a diff.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    /// File path, or the `[schema.]table` name of a database table.
    pub path: PathBuf,
    pub kind: SourceKind,
    /// Database file or `ATTACH` statement holding a database table.
    pub database: Option<String>,
    pub key: Vec<String>,
    pub renames: Renames,
    pub sort: SortStrategy,
    pub delimiter: Option<char>,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>, key: Vec<String>) -> Result<Self> {
        let path = path.into();
        let kind = SourceKind::detect(&path)?;
        Ok(Self {
            path,
            kind,
            database: None,
            key,
            renames: Renames::new(),
            sort: SortStrategy::None,
            delimiter: None,
        })
    }

    /// A `[schema.]table` in `database` instead of a file.
    pub fn database_table(relation: &str, database: Option<String>, key: Vec<String>) -> Self {
        Self {
            path: PathBuf::from(relation),
            kind: SourceKind::DatabaseTable,
            database,
            key,
            renames: Renames::new(),
            sort: SortStrategy::None,
            delimiter: None,
        }
    }

    pub fn with_renames(mut self, renames: Renames) -> Self {
        self.renames = renames;
        self
    }

    pub fn with_sort(mut self, sort: SortStrategy) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_delimiter(mut self, delimiter: Option<char>) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Delimiter for text sources: explicit, then settings, then by extension.
    pub fn text_delimiter(&self, settings: &Settings) -> char {
        self.delimiter.or(settings.csv_delimiter).unwrap_or_else(|| {
            let is_tsv = self
                .path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("tsv"));
            if is_tsv {
                '\t'
            } else {
                ','
            }
        })
    }
}

/// Split a comma-separated column list.
pub fn parse_key_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse renames given either as `old=new` pairs or as `@file.json` holding a
/// JSON object of old to new names.
pub fn parse_renames(spec: &str) -> Result<Renames> {
    match spec.strip_prefix('@') {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|e| {
                KeydiffError::config(format!("Failed to read rename file '{}': {}", path, e))
            })?;
            let map: HashMap<String, String> = serde_json::from_str(&content)?;
            Ok(map.into_iter().collect())
        }
        None => Renames::parse(spec),
    }
}

//! Error types for keydiff operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeydiffError>;

#[derive(Error, Debug)]
pub enum KeydiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Source error: {message}")]
    Source { message: String },

    #[error("Malformed row: {message}")]
    MalformedRow { message: String },

    #[error("Unsupported schema: {message}")]
    Structural { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl KeydiffError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source {
            message: msg.into(),
        }
    }

    pub fn malformed_row(msg: impl Into<String>) -> Self {
        Self::MalformedRow {
            message: msg.into(),
        }
    }

    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// True for errors the caller can fix by changing keys, renames or flags.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

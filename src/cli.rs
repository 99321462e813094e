//! Command-line interface for keydiff

use crate::config::SortStrategy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keydiff")]
#[command(about = "A key-ordered merge-join diff tool for tabular data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to ./keydiff.json when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Hide progress spinners
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Arguments shared by commands that read two sources.
#[derive(Args, Debug, Clone)]
pub struct PairArgs {
    /// Left (old) source: .csv, .tsv, .sql, .parquet, or a table with --db
    pub left: PathBuf,

    /// Right (new) source
    pub right: PathBuf,

    /// Comma-separated key columns
    #[arg(long, short)]
    pub key: String,

    /// Key columns of the right side, when named differently
    #[arg(long)]
    pub right_key: Option<String>,

    /// The left source is not in key order
    #[arg(long)]
    pub sort_left: bool,

    /// The right source is not in key order
    #[arg(long)]
    pub sort_right: bool,

    /// How unsorted sources are ordered: "memory" or "store"
    #[arg(long, value_parser = SortStrategy::parse)]
    pub strategy: Option<SortStrategy>,

    /// Renames for the left side: "old=new,..." or "@renames.json"
    #[arg(long)]
    pub rename_left: Option<String>,

    /// Renames for the right side
    #[arg(long)]
    pub rename_right: Option<String>,

    /// Field delimiter for text sources
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<char>,

    /// Read LEFT and RIGHT as [schema.]table names in this database: a DuckDB
    /// file or an "ATTACH ..." statement
    #[arg(long)]
    pub db: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize the differences between two sources
    Diff {
        #[command(flatten)]
        pair: PairArgs,

        /// Include added rows, deleted keys and changed cells
        #[arg(long)]
        detail: bool,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty", value_parser = OutputFormat::parse)]
        format: OutputFormat,

        /// Write the summary to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Stream every finding as one JSON object per line
    Events {
        #[command(flatten)]
        pair: PairArgs,

        /// Drop row payloads, keeping keys and changed column names
        #[arg(long)]
        redact: bool,

        /// Write events to a file; ".zst" compresses
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Emit every row of a single source as a row-stored event
    Snapshot {
        /// Input source: .csv, .tsv, .sql or .parquet
        input: PathBuf,

        /// Comma-separated key columns
        #[arg(long, short)]
        key: String,

        /// The input is not in key order
        #[arg(long)]
        sort: bool,

        /// How an unsorted input is ordered: "memory" or "store"
        #[arg(long, value_parser = SortStrategy::parse)]
        strategy: Option<SortStrategy>,

        /// Renames: "old=new,..." or "@renames.json"
        #[arg(long)]
        rename: Option<String>,

        /// Field delimiter for text sources
        #[arg(long, value_parser = parse_delimiter)]
        delimiter: Option<char>,

        /// Read INPUT as a [schema.]table name in this database
        #[arg(long)]
        db: Option<String>,

        /// Write events to a file; ".zst" compresses
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// Parse output format string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid output format: {}. Use 'pretty' or 'json'",
                s
            )),
        }
    }
}

/// Accept a single character, or `\t`/`tab` for tabs.
fn parse_delimiter(s: &str) -> Result<char, String> {
    if s == "\\t" || s.eq_ignore_ascii_case("tab") {
        return Ok('\t');
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!(
            "Invalid delimiter: '{}'. Must be a single character.",
            s
        )),
    }
}

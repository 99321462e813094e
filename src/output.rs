//! Output formatting and destinations

use crate::error::Result;
use crate::event::{Event, EventSink};
use crate::summary::TableDiff;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use zstd::{Decoder, Encoder};

/// Compression level for `.zst` outputs.
const ZSTD_LEVEL: i32 = 3;

fn is_compressed(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zst"))
}

/// Where results are written: stdout, a file, or a zstd-compressed file.
pub enum OutputStream {
    Stdout(io::Stdout),
    Plain(BufWriter<File>),
    Compressed(Encoder<'static, BufWriter<File>>),
}

impl OutputStream {
    /// Open `path`, or stdout when `None`. Paths ending in `.zst` are
    /// compressed.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::Stdout(io::stdout()));
        };
        let file = BufWriter::new(File::create(path)?);
        if is_compressed(path) {
            Ok(Self::Compressed(Encoder::new(file, ZSTD_LEVEL)?))
        } else {
            Ok(Self::Plain(file))
        }
    }

    pub fn is_stdout(&self) -> bool {
        matches!(self, Self::Stdout(_))
    }

    /// Flush everything and write the compression trailer if any.
    pub fn finish(self) -> Result<()> {
        match self {
            Self::Stdout(mut out) => out.flush()?,
            Self::Plain(mut file) => file.flush()?,
            Self::Compressed(encoder) => {
                let mut file = encoder.finish()?;
                file.flush()?;
            }
        }
        Ok(())
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(out) => out.write(buf),
            Self::Plain(file) => file.write(buf),
            Self::Compressed(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(out) => out.flush(),
            Self::Plain(file) => file.flush(),
            Self::Compressed(encoder) => encoder.flush(),
        }
    }
}

/// Writes each event as one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: Event) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &event)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }
}

/// Read back an event stream written by [`JsonLinesSink`], decompressing
/// `.zst` files.
pub fn read_events(path: &Path) -> Result<Vec<Event>> {
    let file = File::open(path)?;
    let reader: Box<dyn BufRead> = if is_compressed(path) {
        Box::new(BufReader::new(Decoder::new(file)?))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }
}

/// Pretty printer for terminal output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Render a diff summary as a tree.
    pub fn render_table_diff(diff: &TableDiff, left: &str, right: &str) -> String {
        let mut out = Vec::new();
        out.push(format!("🔍 Diff Results: {} → {}", left, right));

        if diff.columns_added.is_empty()
            && diff.columns_dropped.is_empty()
            && diff.type_changes.is_empty()
        {
            out.push("├─ ✅ Schema: unchanged".to_string());
        } else {
            out.push("├─ ❌ Schema: CHANGED".to_string());
            if !diff.columns_added.is_empty() {
                out.push(format!("│  ├─ Columns added: {}", diff.columns_added.join(", ")));
            }
            if !diff.columns_dropped.is_empty() {
                out.push(format!(
                    "│  ├─ Columns dropped: {}",
                    diff.columns_dropped.join(", ")
                ));
            }
            for (column, change) in &diff.type_changes {
                out.push(format!("│  ├─ {}: {} → {}", column, change.old, change.new));
            }
            if let Some(last) = out.last_mut() {
                *last = last.replacen("│  ├─", "│  └─", 1);
            }
        }

        if diff.rows_added + diff.rows_deleted + diff.rows_changed == 0 {
            out.push("├─ ✅ Rows: unchanged".to_string());
        } else {
            out.push("├─ ❌ Rows:".to_string());
            out.push(format!("│  ├─ Added: {}", diff.rows_added));
            out.push(format!("│  ├─ Deleted: {}", diff.rows_deleted));
            out.push(format!("│  └─ Changed: {}", diff.rows_changed));
        }

        let samples = diff.row_diffs.iter().take(3).collect::<Vec<_>>();
        if !samples.is_empty() {
            out.push(format!("├─ Changed rows (showing {}):", samples.len()));
            for (i, row) in samples.iter().enumerate() {
                let is_last = i == samples.len() - 1;
                let marker = if is_last { "└─" } else { "├─" };
                out.push(format!(
                    "│  {} {}: {} columns changed",
                    marker,
                    render_record(&row.key),
                    row.changes.len()
                ));
                let indent = if is_last { "   " } else { "│  " };
                for (j, (col, change)) in row.changes.iter().enumerate() {
                    let change_marker = if j == row.changes.len() - 1 { "└─" } else { "├─" };
                    out.push(format!(
                        "│  {}{} {}: {} → {}",
                        indent,
                        change_marker,
                        col,
                        render_value(&change.old),
                        render_value(&change.new)
                    ));
                }
            }
        }

        out.push(format!("└─ Total rows: {}", diff.total_rows));
        out.join("\n")
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "∅".to_string(),
        Value::String(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}

fn render_record(record: &crate::table::Record) -> String {
    record
        .iter()
        .map(|(k, v)| format!("{}={}", k, render_value(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

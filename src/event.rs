//! Diff events and the sinks that receive them

use crate::error::Result;
use crate::table::Record;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Old and new value of a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    pub old: Value,
    pub new: Value,
}

/// Per-column changes of a matched row.
pub type Changes = IndexMap<String, ValueChange>;

/// A single finding, tagged by its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Change {
    ColumnAdded {
        column: String,
    },
    ColumnRemoved {
        column: String,
    },
    ColumnChanged {
        column: String,
        old_type: String,
        new_type: String,
    },
    RowAdded {
        offset: u64,
        key: Record,
        data: Record,
    },
    RowRemoved {
        offset: u64,
        key: Record,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Record>,
    },
    RowChanged {
        offset: u64,
        key: Record,
        changes: Changes,
    },
    RowStored {
        offset: u64,
        key: Record,
        data: Record,
    },
}

impl Change {
    /// Event type label as written on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ColumnAdded { .. } => "column-added",
            Self::ColumnRemoved { .. } => "column-removed",
            Self::ColumnChanged { .. } => "column-changed",
            Self::RowAdded { .. } => "row-added",
            Self::RowRemoved { .. } => "row-removed",
            Self::RowChanged { .. } => "row-changed",
            Self::RowStored { .. } => "row-stored",
        }
    }

    /// Row position for row-level events; schema events have none.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::RowAdded { offset, .. }
            | Self::RowRemoved { offset, .. }
            | Self::RowChanged { offset, .. }
            | Self::RowStored { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// A timestamped change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unix seconds at which the run started.
    pub time: i64,
    #[serde(flatten)]
    pub change: Change,
}

impl Event {
    pub fn new(time: i64, change: Change) -> Self {
        Self { time, change }
    }

    pub fn offset(&self) -> Option<u64> {
        self.change.offset()
    }

    /// Strip row payloads from changed and removed rows, keeping keys and the
    /// names of changed columns.
    pub fn redacted(mut self) -> Self {
        match &mut self.change {
            Change::RowChanged { changes, .. } => {
                for change in changes.values_mut() {
                    change.old = Value::Null;
                    change.new = Value::Null;
                }
            }
            Change::RowRemoved { data, .. } => *data = None,
            _ => {}
        }
        self
    }
}

/// Receiver of diff events.
pub trait EventSink {
    fn emit(&mut self, event: Event) -> Result<()>;
}

impl<F> EventSink for F
where
    F: FnMut(Event) -> Result<()>,
{
    fn emit(&mut self, event: Event) -> Result<()> {
        self(event)
    }
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) -> Result<()> {
        self.push(event);
        Ok(())
    }
}

/// Forwards events to an inner sink with row payloads redacted.
pub struct Redacted<S> {
    inner: S,
}

impl<S: EventSink> Redacted<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: EventSink> EventSink for Redacted<S> {
    fn emit(&mut self, event: Event) -> Result<()> {
        self.inner.emit(event.redacted())
    }
}

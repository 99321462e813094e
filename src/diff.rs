//! Merge-join diff engine
//!
//! Walks two key-ordered cursors in lockstep. A schema pre-pass runs once and
//! fixes the sets of compared, dropped and added columns; the row pass then
//! classifies each step as added, removed or matched and emits one event per
//! finding to the caller's sink.

use crate::error::{KeydiffError, Result};
use crate::event::{Change, Changes, Event, EventSink, ValueChange};
use crate::table::{validate_key, Columns, Row, Table};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Column sets derived from the two schemas, fixed for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaPlan {
    pub left_key: Vec<String>,
    pub right_key: Vec<String>,
    /// Shared, same-typed, non-key columns compared cell by cell.
    pub compare: Vec<String>,
    /// Left-only columns.
    pub dropped: Vec<String>,
    /// Right-only columns.
    pub added: Vec<String>,
    /// Shared columns whose type labels differ: (column, old, new).
    pub retyped: Vec<(String, String, String)>,
}

impl SchemaPlan {
    /// Validate both keys and derive the column sets.
    pub fn build<L, R>(left: &L, right: &R) -> Result<Self>
    where
        L: Table + ?Sized,
        R: Table + ?Sized,
    {
        let left_key = left.key().to_vec();
        let right_key = right.key().to_vec();

        if left_key.is_empty() || right_key.is_empty() {
            return Err(KeydiffError::config("a key must be provided"));
        }
        if left_key.len() != right_key.len() {
            return Err(KeydiffError::config(format!(
                "keys are different lengths ({} vs {})",
                left_key.len(),
                right_key.len()
            )));
        }
        validate_key(&left_key, left.columns())
            .map_err(|e| KeydiffError::config(format!("left {}", config_message(&e))))?;
        validate_key(&right_key, right.columns())
            .map_err(|e| KeydiffError::config(format!("right {}", config_message(&e))))?;

        let left_keys: HashSet<&str> = left_key.iter().map(String::as_str).collect();
        let right_keys: HashSet<&str> = right_key.iter().map(String::as_str).collect();

        let left_cols = left.columns();
        let right_cols = right.columns();
        let mut plan = Self {
            left_key: left_key.clone(),
            right_key: right_key.clone(),
            ..Self::default()
        };

        for (col, left_ty) in left_cols {
            match right_cols.get(col) {
                None => plan.dropped.push(col.clone()),
                Some(right_ty) if right_ty != left_ty => {
                    plan.retyped
                        .push((col.clone(), left_ty.clone(), right_ty.clone()));
                }
                Some(_) => {
                    let shared_key =
                        left_keys.contains(col.as_str()) && right_keys.contains(col.as_str());
                    if !shared_key {
                        plan.compare.push(col.clone());
                    }
                }
            }
        }

        for col in right_cols.keys() {
            if !left_cols.contains_key(col) {
                plan.added.push(col.clone());
            }
        }

        log::debug!(
            "schema plan: {} compared, {} dropped, {} added, {} retyped",
            plan.compare.len(),
            plan.dropped.len(),
            plan.added.len(),
            plan.retyped.len()
        );

        Ok(plan)
    }

    /// Schema events in pre-pass order: left columns first, then right.
    fn schema_events(&self, left_columns: &Columns, time: i64) -> Vec<Event> {
        let mut events = Vec::new();
        for col in left_columns.keys() {
            if self.dropped.contains(col) {
                events.push(Event::new(
                    time,
                    Change::ColumnRemoved {
                        column: col.clone(),
                    },
                ));
            } else if let Some((_, old, new)) = self.retyped.iter().find(|(c, _, _)| c == col) {
                events.push(Event::new(
                    time,
                    Change::ColumnChanged {
                        column: col.clone(),
                        old_type: old.clone(),
                        new_type: new.clone(),
                    },
                ));
            }
        }
        for col in &self.added {
            events.push(Event::new(
                time,
                Change::ColumnAdded {
                    column: col.clone(),
                },
            ));
        }
        events
    }

    /// Cell-level changes between two rows with equal keys.
    fn row_changes(&self, left: &Row, right: &Row) -> Changes {
        let mut changes = Changes::new();

        for col in &self.compare {
            if left.bytes(col) != right.bytes(col) {
                changes.insert(
                    col.clone(),
                    ValueChange {
                        old: left.value(col),
                        new: right.value(col),
                    },
                );
            }
        }

        // Dropped and added columns are reported on every matched row.
        for col in &self.dropped {
            changes.insert(
                col.clone(),
                ValueChange {
                    old: left.value(col),
                    new: Value::Null,
                },
            );
        }
        for col in &self.added {
            changes.insert(
                col.clone(),
                ValueChange {
                    old: Value::Null,
                    new: right.value(col),
                },
            );
        }

        changes
    }
}

fn config_message(err: &KeydiffError) -> String {
    match err {
        KeydiffError::Config { message } => message.clone(),
        other => other.to_string(),
    }
}

/// Byte-wise lexicographic comparison of key tuples, column by column.
pub fn compare_keys<A, B>(left: &[A], right: &[B]) -> Ordering
where
    A: AsRef<[u8]>,
    B: AsRef<[u8]>,
{
    for (l, r) in left.iter().zip(right) {
        match l.as_ref().cmp(r.as_ref()) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    left.len().cmp(&right.len())
}

/// Copy the key bytes of `row` into a reusable buffer.
fn capture_key(row: &Row, key: &[String], buf: &mut [Vec<u8>]) {
    for (slot, col) in buf.iter_mut().zip(key) {
        slot.clear();
        if let Some(bytes) = row.bytes(col) {
            slot.extend_from_slice(bytes);
        }
    }
}

fn current<'a, T: Table + ?Sized>(table: &'a T, side: &str) -> Result<&'a Row> {
    table
        .row()
        .ok_or_else(|| KeydiffError::source(format!("{} cursor advanced without a row", side)))
}

/// Classification of one merge-join step.
#[derive(Debug, Clone, Copy)]
enum Step {
    Added,
    Removed,
    Matched,
}

/// Diff two key-ordered tables, emitting every finding to `sink`.
///
/// Configuration errors are reported before any event is emitted. Cursor and
/// sink errors abort the run immediately.
pub fn diff_events<L, R, S>(left: &mut L, right: &mut R, sink: &mut S) -> Result<()>
where
    L: Table + ?Sized,
    R: Table + ?Sized,
    S: EventSink + ?Sized,
{
    let plan = SchemaPlan::build(&*left, &*right)?;
    let time = chrono::Utc::now().timestamp();

    for event in plan.schema_events(left.columns(), time) {
        sink.emit(event)?;
    }

    let width = plan.left_key.len();
    let mut left_key = vec![Vec::new(); width];
    let mut right_key = vec![Vec::new(); width];

    let (mut need_left, mut need_right) = (true, true);
    let (mut has_left, mut has_right) = (false, false);
    let mut offset: u64 = 0;

    loop {
        offset += 1;

        if need_left {
            need_left = false;
            has_left = left.advance()?;
            if has_left {
                capture_key(current(&*left, "left")?, &plan.left_key, &mut left_key);
            }
        }

        if need_right {
            need_right = false;
            has_right = right.advance()?;
            if has_right {
                capture_key(current(&*right, "right")?, &plan.right_key, &mut right_key);
            }
        }

        let step = match (has_left, has_right) {
            (false, false) => break,
            (false, true) => Step::Added,
            (true, false) => Step::Removed,
            (true, true) => match compare_keys(&left_key, &right_key) {
                Ordering::Less => Step::Removed,
                Ordering::Greater => Step::Added,
                Ordering::Equal => Step::Matched,
            },
        };

        match step {
            Step::Added => {
                need_right = true;
                let row = current(&*right, "right")?;
                sink.emit(Event::new(
                    time,
                    Change::RowAdded {
                        offset,
                        key: row.record_of(&plan.right_key),
                        data: row.record(),
                    },
                ))?;
            }
            Step::Removed => {
                need_left = true;
                let row = current(&*left, "left")?;
                sink.emit(Event::new(
                    time,
                    Change::RowRemoved {
                        offset,
                        key: row.record_of(&plan.left_key),
                        data: Some(row.record()),
                    },
                ))?;
            }
            Step::Matched => {
                need_left = true;
                need_right = true;
                let l = current(&*left, "left")?;
                let r = current(&*right, "right")?;
                let changes = plan.row_changes(l, r);
                if !changes.is_empty() {
                    sink.emit(Event::new(
                        time,
                        Change::RowChanged {
                            offset,
                            key: l.record_of(&plan.left_key),
                            changes,
                        },
                    ))?;
                }
            }
        }
    }

    log::debug!("merge-join finished after {} steps", offset - 1);
    Ok(())
}

/// Emit one `row-stored` event per row of a single key-ordered table.
pub fn snapshot<T, S>(table: &mut T, sink: &mut S) -> Result<()>
where
    T: Table + ?Sized,
    S: EventSink + ?Sized,
{
    let key = table.key().to_vec();
    validate_key(&key, table.columns())?;

    let time = chrono::Utc::now().timestamp();
    let mut offset: u64 = 0;

    loop {
        offset += 1;
        if !table.advance()? {
            break;
        }
        let row = current(&*table, "snapshot")?;
        sink.emit(Event::new(
            time,
            Change::RowStored {
                offset,
                key: row.record_of(&key),
                data: row.record(),
            },
        ))?;
    }

    log::debug!("snapshot stored {} rows", offset - 1);
    Ok(())
}

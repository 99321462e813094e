//! Progress reporting utilities

use crate::error::Result;
use crate::event::{Event, EventSink};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Offsets between spinner refreshes during the row pass.
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Spinner-based progress reporter for keydiff operations
#[derive(Debug)]
pub struct ProgressReporter {
    spinner: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new(message: &str) -> Self {
        Self {
            spinner: Some(create_spinner(message)),
        }
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self { spinner: None }
    }

    /// Build a reporter, or a silent one when `enabled` is false.
    pub fn enabled(enabled: bool, message: &str) -> Self {
        if enabled {
            Self::new(message)
        } else {
            Self::new_minimal()
        }
    }

    pub fn set_message(&self, message: &str) {
        if let Some(pb) = &self.spinner {
            pb.set_message(message.to_string());
        }
    }

    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

/// Forwards events to an inner sink and reports the current offset.
pub struct ProgressSink<'a, S: EventSink + ?Sized> {
    inner: &'a mut S,
    reporter: &'a ProgressReporter,
    last_reported: u64,
}

impl<'a, S: EventSink + ?Sized> ProgressSink<'a, S> {
    pub fn new(inner: &'a mut S, reporter: &'a ProgressReporter) -> Self {
        Self {
            inner,
            reporter,
            last_reported: 0,
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for ProgressSink<'_, S> {
    fn emit(&mut self, event: Event) -> Result<()> {
        if let Some(offset) = event.offset() {
            if offset >= self.last_reported + PROGRESS_INTERVAL {
                self.last_reported = offset;
                self.reporter
                    .set_message(&format!("Comparing rows... {} visited", offset));
            }
        }
        self.inner.emit(event)
    }
}

/// Create a spinner progress bar on stderr
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

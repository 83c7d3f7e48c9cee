//! Reading session state: identity plus the pending progress report.
//!
//! One session exists per player load, owned by its dispatcher task. The
//! progress buffer holds at most one report; later updates overwrite earlier
//! ones, and the dispatcher flushes it at most once when the session
//! permanently ends.

use serde_json::Value;

/// Holds the most recent progress report until session end.
#[derive(Debug, Default)]
pub struct ProgressBuffer {
    pending: Option<Value>,
}

impl ProgressBuffer {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Replace any previously held report with `report`.
    pub fn update(&mut self, report: Value) {
        self.pending = Some(report);
    }

    /// Return and clear the held report. Subsequent calls return `None` until
    /// the next update.
    pub fn take_and_clear(&mut self) -> Option<Value> {
        self.pending.take()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }
}

/// State for one player session.
#[derive(Debug)]
pub struct ReaderSession {
    pub id: String,
    /// Book identity for logs (e.g. the book folder name).
    pub book: String,
    pub progress: ProgressBuffer,
}

impl ReaderSession {
    pub fn new(book: impl Into<String>) -> Self {
        Self {
            id: format!("read-{}", uuid::Uuid::new_v4()),
            book: book.into(),
            progress: ProgressBuffer::new(),
        }
    }
}

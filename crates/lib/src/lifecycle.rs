//! Host lifecycle signals for a player session.
//!
//! The shell asserts suspension vs termination explicitly; the bridge never
//! infers one from the other. Only `Terminated` flushes the progress report.

use std::path::PathBuf;

/// Signal from the host shell about the session's lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleSignal {
    /// App backgrounded; session state is retained and nothing is flushed.
    Suspended,
    /// App foregrounded again after a suspension.
    Resumed,
    /// Session is ending for good; the pending progress report is flushed and
    /// the session state discarded.
    Terminated,
    /// A new or updated book should take over. The shell hands off to a fresh
    /// session rather than reloading in place, then terminates this one.
    BookReplaced(PathBuf),
}

/// Event from the bridge back to the host shell.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The player's back control was activated; the shell should close the reader.
    CloseRequested,
    /// Open this book in a fresh session (from `LifecycleSignal::BookReplaced`).
    ReplaceBook(PathBuf),
}

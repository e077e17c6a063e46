//! Reporting of watch payloads that had to be dropped.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::error;

/// Why a watch event was dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// The payload decoded to a different kind than the watch expects.
    UnexpectedKind { found: String },
    /// The payload could not be decoded at all.
    Undecodable { error: String },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedKind { found } => write!(f, "unexpected object of kind {found}"),
            Self::Undecodable { error } => write!(f, "undecodable object: {error}"),
        }
    }
}

/// A dropped watch event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Kind name of the watch that dropped the event.
    pub watch_kind: &'static str,
    pub key: String,
    pub version: u64,
    pub reason: DropReason,
}

/// Receives diagnostics from watch adapters.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

/// Sink that logs every diagnostic through `tracing` at error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, diagnostic: Diagnostic) {
        error!(
            kind = diagnostic.watch_kind,
            key = %diagnostic.key,
            version = diagnostic.version,
            reason = %diagnostic.reason,
            "dropping object during watch"
        );
    }
}

/// Sink that keeps every diagnostic in memory, for tests and inspection.
#[derive(Debug, Default)]
pub struct InMemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics recorded so far, oldest first.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for InMemorySink {
    fn record(&self, diagnostic: Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}

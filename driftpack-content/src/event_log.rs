//! Audit logging of import/export outcomes.

use chrono::{DateTime, Utc};
use driftpack_types::DocRef;
use parking_lot::Mutex;
use tracing::{error, info};

/// Which operation an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOperation {
    Import,
    Export,
}

/// One recorded audit event.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub time: DateTime<Utc>,
    pub operation: AuditOperation,
    pub doc_ref: DocRef,
    /// Error text for failed operations, `None` on success.
    pub error: Option<String>,
}

/// Receives one event per document imported or exported.
pub trait ContentEventLog: Send + Sync {
    fn import_document(&self, doc_ref: &DocRef, error: Option<&str>);
    fn export_document(&self, doc_ref: &DocRef, error: Option<&str>);
}

/// Default log: forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventLog;

impl ContentEventLog for TracingEventLog {
    fn import_document(&self, doc_ref: &DocRef, error: Option<&str>) {
        match error {
            None => info!(doc = %doc_ref, "imported document"),
            Some(message) => error!(doc = %doc_ref, error = message, "import failed"),
        }
    }

    fn export_document(&self, doc_ref: &DocRef, error: Option<&str>) {
        match error {
            None => info!(doc = %doc_ref, "exported document"),
            Some(message) => error!(doc = %doc_ref, error = message, "export failed"),
        }
    }
}

/// Log that keeps timestamped entries in memory, for embedders that report
/// audit trails and for tests.
#[derive(Debug, Default)]
pub struct RecordingEventLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingEventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    fn record(&self, operation: AuditOperation, doc_ref: &DocRef, error: Option<&str>) {
        self.entries.lock().push(AuditEntry {
            time: Utc::now(),
            operation,
            doc_ref: doc_ref.clone(),
            error: error.map(str::to_string),
        });
    }
}

impl ContentEventLog for RecordingEventLog {
    fn import_document(&self, doc_ref: &DocRef, error: Option<&str>) {
        self.record(AuditOperation::Import, doc_ref, error);
    }

    fn export_document(&self, doc_ref: &DocRef, error: Option<&str>) {
        self.record(AuditOperation::Export, doc_ref, error);
    }
}

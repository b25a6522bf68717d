//! Per-document import outcome records.

use driftpack_types::{DocRef, Message, Severity};
use serde::{Deserialize, Serialize};

/// What an import run decided about one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// No document with this identity exists yet.
    New,
    /// An existing document will be (or was) updated.
    Update,
    /// The document is skipped by user choice.
    Ignore,
}

/// The outcome record for one document processed during an import.
///
/// Created once per (type, uuid, name) identity; repeated descriptors for
/// the same identity accumulate into the same record. Consumed by the caller
/// for confirmation dialogs and reporting; the engine never re-reads one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportState {
    pub doc_ref: DocRef,
    /// Set once per run from the existing-node lookup.
    pub state: Option<State>,
    /// Where the document came from, per the descriptor.
    pub source_path: String,
    /// Where the document will land in the hierarchy.
    pub dest_path: Option<String>,
    /// In per-item confirmation mode: whether the user ticked this item.
    pub action: bool,
    pub messages: Vec<Message>,
}

impl ImportState {
    #[must_use]
    pub fn new(doc_ref: DocRef, source_path: impl Into<String>) -> Self {
        Self {
            doc_ref,
            state: None,
            source_path: source_path.into(),
            dest_path: None,
            action: false,
            messages: Vec::new(),
        }
    }

    pub fn add_message(&mut self, severity: Severity, text: impl Into<String>) {
        self.messages.push(Message::new(severity, text));
    }

    /// True when any `Error`/`Fatal` message was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity.is_error())
    }
}

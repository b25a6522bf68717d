//! Per-type outcome counts for an export run.

use driftpack_types::{Message, Severity};
use std::collections::BTreeMap;

/// What an export run achieved, bucketed by document type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    successes: BTreeMap<String, usize>,
    failures: BTreeMap<String, usize>,
    messages: Vec<Message>,
}

impl ExportSummary {
    pub fn add_success(&mut self, doc_type: &str) {
        *self.successes.entry(doc_type.to_string()).or_default() += 1;
    }

    pub fn add_failure(&mut self, doc_type: &str) {
        *self.failures.entry(doc_type.to_string()).or_default() += 1;
    }

    pub fn add_message(&mut self, severity: Severity, text: impl Into<String>) {
        self.messages.push(Message::new(severity, text));
    }

    pub fn extend_messages(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// Successful exports per document type.
    #[must_use]
    pub fn successes(&self) -> &BTreeMap<String, usize> {
        &self.successes
    }

    /// Failed exports per document type.
    #[must_use]
    pub fn failures(&self) -> &BTreeMap<String, usize> {
        &self.failures
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.values().sum()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.values().sum()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

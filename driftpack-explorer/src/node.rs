//! Hierarchy node type.

use driftpack_types::DocRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A document's placement in the hierarchy: its reference plus any tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerNode {
    pub doc_ref: DocRef,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl ExplorerNode {
    #[must_use]
    pub fn new(doc_ref: DocRef) -> Self {
        Self {
            doc_ref,
            tags: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_tags(doc_ref: DocRef, tags: BTreeSet<String>) -> Self {
        Self { doc_ref, tags }
    }

    /// The node's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.doc_ref.name_or_uuid()
    }

    /// True for folder nodes.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.doc_ref.is_folder()
    }
}

//! In-memory document storage.

use crate::{Document, ModelError, ModelResult};
use driftpack_types::DocRef;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Stores documents keyed by uuid.
///
/// The store is shared between handlers and the content engine; interior
/// locking keeps the handler trait object usable behind `Arc` without
/// threading mutability through every call site.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<BTreeMap<String, Document>>,
}

impl DocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a document.
    pub fn put(&self, document: Document) {
        self.documents
            .write()
            .insert(document.uuid.clone(), document);
    }

    /// Fetches a copy of a document by uuid.
    #[must_use]
    pub fn get(&self, uuid: &str) -> Option<Document> {
        self.documents.read().get(uuid).cloned()
    }

    /// Fetches a document or fails with `NotFound`.
    pub fn require(&self, doc_ref: &DocRef) -> ModelResult<Document> {
        self.get(&doc_ref.uuid)
            .ok_or_else(|| ModelError::NotFound(doc_ref.to_string()))
    }

    #[must_use]
    pub fn exists(&self, uuid: &str) -> bool {
        self.documents.read().contains_key(uuid)
    }

    pub fn remove(&self, uuid: &str) -> Option<Document> {
        self.documents.write().remove(uuid)
    }

    /// References of every stored document, in uuid order.
    #[must_use]
    pub fn doc_refs(&self) -> Vec<DocRef> {
        self.documents.read().values().map(Document::doc_ref).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

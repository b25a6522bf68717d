//! Store-backed handler serializing documents as JSON.

use crate::{
    AuditFields, Document, DocumentStore, ImportHandler, ImportSettings, ImportState, ModelError,
    ModelResult, OwnerLookup,
};
use driftpack_types::{DocRef, Message};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Payload map key used for the serialized document.
pub const JSON_KEY: &str = "json";

const IMPORT_USER: &str = "import";

/// Generic handler for hierarchy-resident document types whose payload is
/// plain JSON. One instance serves one document type against a shared
/// [`DocumentStore`].
pub struct JsonDocumentHandler {
    doc_type: String,
    store: Arc<DocumentStore>,
}

impl JsonDocumentHandler {
    #[must_use]
    pub fn new(doc_type: impl Into<String>, store: Arc<DocumentStore>) -> Self {
        Self {
            doc_type: doc_type.into(),
            store,
        }
    }
}

impl ImportHandler for JsonDocumentHandler {
    fn doc_type(&self) -> &str {
        &self.doc_type
    }

    fn import_document(
        &self,
        doc_ref: &DocRef,
        data: &BTreeMap<String, Vec<u8>>,
        state: &mut ImportState,
        settings: &ImportSettings,
    ) -> ModelResult<DocRef> {
        let bytes = data.get(JSON_KEY).ok_or_else(|| ModelError::MissingPayload {
            doc_ref: doc_ref.to_string(),
            key: JSON_KEY.to_string(),
        })?;
        let mut incoming: Document =
            serde_json::from_slice(bytes).map_err(|e| ModelError::InvalidPayload {
                doc_ref: doc_ref.to_string(),
                reason: e.to_string(),
            })?;

        // The descriptor's identity wins over whatever the payload says.
        incoming.uuid = doc_ref.uuid.clone();
        incoming.doc_type = doc_ref.doc_type.clone();
        if let Some(name) = &doc_ref.name {
            incoming.name = name.clone();
        }

        let existing = self.store.get(&doc_ref.uuid);

        // On update the returned reference carries the existing document's
        // name; renames go through the hierarchy service, not the store.
        let result_ref = match &existing {
            Some(doc) => doc_ref.with_name(doc.name.clone()),
            None => doc_ref.clone(),
        };

        if settings.ok(state) {
            match existing {
                Some(doc) => {
                    incoming.name = doc.name.clone();
                    incoming.audit = Some(match doc.audit {
                        Some(audit) => audit.updated_by(IMPORT_USER),
                        None => AuditFields::now(IMPORT_USER),
                    });
                }
                None => {
                    if incoming.audit.is_none() {
                        incoming.audit = Some(AuditFields::now(IMPORT_USER));
                    }
                }
            }
            debug!(doc = %doc_ref, "persisting imported document");
            self.store.put(incoming);
        } else {
            debug!(doc = %doc_ref, "dry run; payload validated but not persisted");
        }

        Ok(result_ref)
    }

    fn export_document(
        &self,
        doc_ref: &DocRef,
        omit_audit: bool,
        _messages: &mut Vec<Message>,
    ) -> ModelResult<BTreeMap<String, Vec<u8>>> {
        let document = self.store.require(doc_ref)?;
        let document = if omit_audit {
            document.without_audit()
        } else {
            document
        };

        let mut data = BTreeMap::new();
        data.insert(JSON_KEY.to_string(), serde_json::to_vec_pretty(&document)?);
        Ok(data)
    }

    fn owner_lookup(&self) -> Option<&dyn OwnerLookup> {
        None
    }
}

//! The per-document-type handler contract.

use crate::{ImportSettings, ImportState, ModelResult};
use driftpack_types::{DocRef, Message};
use std::collections::BTreeMap;

/// Serializes and deserializes documents of one type.
///
/// The content engine walks trees and reconciles the hierarchy; handlers own
/// the document payloads themselves. An export produces a map of filename
/// suffix to bytes; an import consumes the same map.
pub trait ImportHandler: Send + Sync {
    /// The document type this handler owns.
    fn doc_type(&self) -> &str;

    /// Imports one document from its payload map.
    ///
    /// Must only persist when `settings.ok(state)` holds; otherwise the call
    /// is a dry run that validates the payload and reports what would
    /// happen. Returns the reference of the (would-be) imported document;
    /// on update it carries the existing document's name.
    fn import_document(
        &self,
        doc_ref: &DocRef,
        data: &BTreeMap<String, Vec<u8>>,
        state: &mut ImportState,
        settings: &ImportSettings,
    ) -> ModelResult<DocRef>;

    /// Exports one document as a payload map.
    fn export_document(
        &self,
        doc_ref: &DocRef,
        omit_audit: bool,
        messages: &mut Vec<Message>,
    ) -> ModelResult<BTreeMap<String, Vec<u8>>>;

    /// Externally-owned documents attached to this one (exported alongside
    /// it). Most types have none.
    fn associated_doc_refs(&self, _doc_ref: &DocRef) -> Vec<DocRef> {
        Vec::new()
    }

    /// Ownership-resolution capability for document types that live outside
    /// the hierarchy, owned by another document. `None` for ordinary
    /// hierarchy-resident types.
    fn owner_lookup(&self) -> Option<&dyn OwnerLookup> {
        None
    }
}

/// Resolves the owner of an externally-owned document.
pub trait OwnerLookup {
    /// The document that owns `doc_ref`, derived from the reference and/or
    /// its payload.
    fn owner_document(&self, doc_ref: &DocRef, data: &BTreeMap<String, Vec<u8>>)
    -> Option<DocRef>;

    /// The nearest hierarchy-resident reference, used to pick an export
    /// location.
    fn nearest_explorer_ref(&self, doc_ref: &DocRef) -> Option<DocRef>;

    /// Display name used when exporting (the owned document itself may be
    /// nameless).
    fn export_name(&self, _doc_ref: &DocRef) -> Option<String> {
        None
    }
}

//! Document permission policy.
//!
//! The content engine consults the policy before creating nodes, updating
//! existing documents, or exporting; a denial fails closed. Embedders plug
//! in their own policy; the default permits everything.

use driftpack_types::DocRef;

/// Decides what the current caller may do to documents.
pub trait DocumentPermissions: Send + Sync {
    /// May the caller read/export this document?
    fn has_view(&self, doc_ref: &DocRef) -> bool;

    /// May the caller update this document?
    fn has_edit(&self, doc_ref: &DocRef) -> bool;

    /// May the caller create a child of `child_type` under `parent`?
    fn has_create(&self, parent: &DocRef, child_type: &str) -> bool;
}

/// Policy that permits everything. The default for embedded use where an
/// outer layer has already authenticated the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermitAll;

impl DocumentPermissions for PermitAll {
    fn has_view(&self, _doc_ref: &DocRef) -> bool {
        true
    }

    fn has_edit(&self, _doc_ref: &DocRef) -> bool {
        true
    }

    fn has_create(&self, _parent: &DocRef, _child_type: &str) -> bool {
        true
    }
}

//! The content serializer: shared state for import and export runs.

use crate::ContentEventLog;
use driftpack_explorer::{DocumentPermissions, ExplorerTree};
use driftpack_model::HandlerRegistry;

/// Imports and exports content trees against one hierarchy.
///
/// Borrow-per-run: construct one for the duration of an import or export
/// call and discard it; no state survives between runs.
pub struct ContentSerializer<'a> {
    pub(crate) registry: &'a HandlerRegistry,
    pub(crate) tree: &'a mut ExplorerTree,
    pub(crate) permissions: &'a dyn DocumentPermissions,
    pub(crate) event_log: &'a dyn ContentEventLog,
}

impl<'a> ContentSerializer<'a> {
    #[must_use]
    pub fn new(
        registry: &'a HandlerRegistry,
        tree: &'a mut ExplorerTree,
        permissions: &'a dyn DocumentPermissions,
        event_log: &'a dyn ContentEventLog,
    ) -> Self {
        Self {
            registry,
            tree,
            permissions,
            event_log,
        }
    }
}

//! Document references.
//!
//! A [`DocRef`] is the portable identity of a document: its type name, its
//! uuid, and (usually) its display name. Names are optional because some
//! externally-owned documents, such as processor filters, have none.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Type name of folder documents in the hierarchy.
pub const FOLDER_TYPE: &str = "Folder";

/// Type name of the hierarchy root.
pub const SYSTEM_TYPE: &str = "System";

/// Reference to a document by (type, uuid, name).
///
/// Equality, ordering, and hashing cover all three fields: per-document
/// import state is keyed by the full identity so that a descriptor carrying
/// a new name for a known uuid is tracked as its own record. Lookups that
/// must survive renames key by uuid alone (see `ExplorerTree::get_node`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocRef {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DocRef {
    /// Creates a reference with an explicit uuid.
    #[must_use]
    pub fn new(doc_type: impl Into<String>, uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            uuid: uuid.into(),
            name: Some(name.into()),
        }
    }

    /// Creates a nameless reference (externally-owned documents).
    #[must_use]
    pub fn unnamed(doc_type: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            uuid: uuid.into(),
            name: None,
        }
    }

    /// Creates a reference with a freshly generated v4 uuid.
    #[must_use]
    pub fn generate(doc_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(doc_type, Uuid::new_v4().to_string(), name)
    }

    /// The display name, falling back to the uuid for nameless documents.
    #[must_use]
    pub fn name_or_uuid(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uuid)
    }

    /// True for folder documents.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.doc_type == FOLDER_TYPE
    }

    /// Returns a copy carrying the given name.
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            doc_type: self.doc_type.clone(),
            uuid: self.uuid.clone(),
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for DocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.doc_type, self.uuid)?;
        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

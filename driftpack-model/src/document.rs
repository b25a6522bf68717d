//! The generic document container.

use chrono::{DateTime, Utc};
use driftpack_types::DocRef;
use serde::{Deserialize, Serialize};

/// Who created and last updated a document, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFields {
    pub create_time: DateTime<Utc>,
    pub create_user: String,
    pub update_time: DateTime<Utc>,
    pub update_user: String,
}

impl AuditFields {
    /// Fresh audit fields stamped now for the given user.
    #[must_use]
    pub fn now(user: impl Into<String>) -> Self {
        let user = user.into();
        let time = Utc::now();
        Self {
            create_time: time,
            create_user: user.clone(),
            update_time: time,
            update_user: user,
        }
    }

    /// Returns a copy updated now by the given user, keeping creation info.
    #[must_use]
    pub fn updated_by(&self, user: impl Into<String>) -> Self {
        Self {
            create_time: self.create_time,
            create_user: self.create_user.clone(),
            update_time: Utc::now(),
            update_user: user.into(),
        }
    }
}

/// A stored document: identity plus an arbitrary JSON payload whose shape is
/// defined by the document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub uuid: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub name: String,
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditFields>,
}

impl Document {
    #[must_use]
    pub fn new(doc_ref: &DocRef, data: serde_json::Value) -> Self {
        Self {
            uuid: doc_ref.uuid.clone(),
            doc_type: doc_ref.doc_type.clone(),
            name: doc_ref.name_or_uuid().to_string(),
            data,
            audit: None,
        }
    }

    /// The document's reference.
    #[must_use]
    pub fn doc_ref(&self) -> DocRef {
        DocRef::new(self.doc_type.clone(), self.uuid.clone(), self.name.clone())
    }

    /// A copy with audit fields stripped, for audit-free export.
    #[must_use]
    pub fn without_audit(&self) -> Self {
        Self {
            audit: None,
            ..self.clone()
        }
    }
}

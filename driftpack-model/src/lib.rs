//! Document model and handler contracts for Driftpack.
//!
//! Defines the types shared between the content serializer and the
//! per-document-type handlers:
//! - [`Document`] — the generic data container (identity, JSON payload,
//!   audit fields)
//! - [`DocumentStore`] — in-memory document storage keyed by uuid
//! - [`ImportHandler`] / [`OwnerLookup`] — the handler contract, with
//!   ownership resolution as an optional capability
//! - [`HandlerRegistry`] — type-keyed handler lookup
//! - [`ImportState`] / [`ImportSettings`] — the per-document outcome record
//!   and the knobs controlling an import run
//!
//! These types form the contract between document types and the content
//! engine; the tree walking itself lives in `driftpack-content`.

mod document;
mod handler;
mod json_handler;
mod registry;
mod settings;
mod state;
mod store;

pub use document::{AuditFields, Document};
pub use handler::{ImportHandler, OwnerLookup};
pub use json_handler::{JSON_KEY, JsonDocumentHandler};
pub use registry::HandlerRegistry;
pub use settings::{ImportMode, ImportSettings};
pub use state::{ImportState, State};
pub use store::DocumentStore;

/// Result type alias using the crate's error type.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Errors raised by document handlers and the store.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("missing payload entry '{key}' for {doc_ref}")]
    MissingPayload { doc_ref: String, key: String },

    #[error("invalid payload for {doc_ref}: {reason}")]
    InvalidPayload { doc_ref: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

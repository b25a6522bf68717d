//! Content tree import/export for Driftpack.
//!
//! Moves document trees between the live hierarchy and a serialized on-disk
//! form: a directory tree of `.node` descriptor files (one per document)
//! plus companion data files holding each document's payload.
//!
//! Importing reconciles the on-disk tree against the hierarchy, deciding
//! per descriptor whether it is a new document, an update, a rename, and/or
//! a move, and drives the type handlers that persist the payloads.
//! Exporting walks the hierarchy the other way, mirroring folder names into
//! sanitized directories. [`ContentPack`] zips an export tree into a single
//! portable archive.
//!
//! One descriptor failing never stops the walk: the failure is logged,
//! recorded on that document's [`driftpack_model::ImportState`], and the
//! remaining files are processed.

mod event_log;
mod export;
mod file_name;
mod import;
mod migration;
mod node_file;
mod pack;
mod properties;
mod serializer;
mod summary;

pub use event_log::{AuditEntry, AuditOperation, ContentEventLog, RecordingEventLog, TracingEventLog};
pub use file_name::{MAX_FILE_NAME_LENGTH, file_prefix, to_safe_file_name};
pub use migration::migrate;
pub use node_file::{NODE_EXTENSION, NodeFile, V2_VERSION};
pub use pack::{ContentPack, PACK_MANIFEST_ENTRY, PackManifest};
pub use serializer::ContentSerializer;
pub use summary::ExportSummary;

/// Result type alias using the crate's error type.
pub type ContentResult<T> = std::result::Result<T, ContentError>;

/// Errors raised while importing or exporting content trees.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("descriptor file '{path}' is invalid: {reason}")]
    NodeFile { path: String, reason: String },

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("no handler registered for document type '{0}'")]
    MissingHandler(String),

    #[error("owner document for '{0}' could not be resolved")]
    MissingOwner(String),

    #[error("no documents were found that could be exported")]
    NoDocumentsToExport,

    #[error("invalid content pack: {0}")]
    Pack(String),

    #[error(transparent)]
    Handler(#[from] driftpack_model::ModelError),

    #[error(transparent)]
    Explorer(#[from] driftpack_explorer::ExplorerError),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("pack manifest error: {0}")]
    ManifestSerialize(#[from] toml::ser::Error),

    #[error("pack manifest error: {0}")]
    ManifestDeserialize(#[from] toml::de::Error),
}

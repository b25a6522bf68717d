//! The live document hierarchy for Driftpack.
//!
//! Documents live in a folder tree rooted at a fixed `System` node. This
//! crate provides the in-memory tree service the content engine reconciles
//! against ([`ExplorerTree`]) and the permission policy consulted before
//! tree mutations ([`DocumentPermissions`]).
//!
//! The tree owns placement only: parent relations, names, tags. Document
//! payloads live in the document store; a node is a lookup entry, not the
//! document itself.

mod node;
mod permission;
mod tree;

pub use node::ExplorerNode;
pub use permission::{DocumentPermissions, PermitAll};
pub use tree::ExplorerTree;

/// Result type alias using the crate's error type.
pub type ExplorerResult<T> = std::result::Result<T, ExplorerError>;

/// Errors raised by hierarchy operations.
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error("node not found: {0}")]
    NotFound(String),

    #[error("a node with uuid '{0}' already exists")]
    Duplicate(String),

    #[error("the root node cannot be renamed, moved, or re-created")]
    RootImmutable,

    #[error("cannot move '{0}' into its own subtree")]
    MoveIntoSelf(String),
}
